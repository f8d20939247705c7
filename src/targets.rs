//! Probe targets for the deployed MFE stack.
//!
//! The host application serves at the site root and composes the console
//! module from `/console/`; the tables below mirror that topology. Every
//! path is joined onto the base URL discovered from the ingress.

/// One HTTP endpoint with an expected status.
pub struct EndpointTarget {
    pub path: &'static str,
    pub label: &'static str,
    pub expected_status: u16,
}

/// A labeled URL path.
pub struct PathTarget {
    pub path: &'static str,
    pub label: &'static str,
}

/// One body-content requirement.
pub struct ContentTarget {
    pub path: &'static str,
    pub label: &'static str,
    pub expected: &'static str,
}

/// Marker both Vite-built pages must serve.
pub const PAGE_MARKER: &str = "Vite + React";

/// Main page endpoints. Each must answer its expected status.
pub const MAIN_ENDPOINTS: &[EndpointTarget] = &[
    EndpointTarget {
        path: "/",
        label: "Host App",
        expected_status: 200,
    },
    EndpointTarget {
        path: "/console/",
        label: "Console App",
        expected_status: 200,
    },
    EndpointTarget {
        path: "/console",
        label: "Console Redirect",
        expected_status: 200,
    },
];

/// Built bundle assets. A missing asset (404) is tolerated as a warning,
/// since hashed bundle names shift between builds.
pub const STATIC_ASSETS: &[EndpointTarget] = &[
    EndpointTarget {
        path: "/assets/index.css",
        label: "Host CSS",
        expected_status: 200,
    },
    EndpointTarget {
        path: "/assets/index.js",
        label: "Host JS",
        expected_status: 200,
    },
    EndpointTarget {
        path: "/console/assets/index.css",
        label: "Console CSS",
        expected_status: 200,
    },
    EndpointTarget {
        path: "/console/assets/index.js",
        label: "Console JS",
        expected_status: 200,
    },
    EndpointTarget {
        path: "/console/assets/remoteEntry.js",
        label: "Console Remote Entry",
        expected_status: 200,
    },
];

/// Pages whose bodies must carry [`PAGE_MARKER`].
pub const CONTENT_CHECKS: &[ContentTarget] = &[
    ContentTarget {
        path: "/",
        label: "Host App",
        expected: PAGE_MARKER,
    },
    ContentTarget {
        path: "/console/",
        label: "Console App",
        expected: PAGE_MARKER,
    },
];

/// Endpoints load-tested at the default sample size.
pub const LOAD_TEST_TARGETS: &[PathTarget] = &[
    PathTarget {
        path: "/",
        label: "Host App",
    },
    PathTarget {
        path: "/console/",
        label: "Console App",
    },
];

/// Endpoints timed for the response-time report.
pub const PERFORMANCE_TARGETS: &[PathTarget] = &[
    PathTarget {
        path: "/",
        label: "Host App",
    },
    PathTarget {
        path: "/console/",
        label: "Console App",
    },
];

/// Join a discovered base URL with a target path.
#[must_use]
pub fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_normalizes_trailing_slash() {
        assert_eq!(join_url("http://203.0.113.7", "/console/"), "http://203.0.113.7/console/");
        assert_eq!(join_url("http://203.0.113.7/", "/console/"), "http://203.0.113.7/console/");
        assert_eq!(join_url("http://203.0.113.7", "/"), "http://203.0.113.7/");
    }

    #[test]
    fn test_remote_entry_is_probed() {
        // The module federation entry point is the one asset the host
        // cannot start without.
        assert!(STATIC_ASSETS
            .iter()
            .any(|t| t.path.ends_with("remoteEntry.js")));
    }

    #[test]
    fn test_all_expected_statuses_are_ok() {
        for target in MAIN_ENDPOINTS.iter().chain(STATIC_ASSETS) {
            assert_eq!(target.expected_status, 200, "{}", target.path);
        }
    }
}
