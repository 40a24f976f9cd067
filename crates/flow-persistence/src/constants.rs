//! Client-wide constants
//!
//! Single source of truth for backend paths, environment variable names and
//! configuration defaults.

/// Default values for client configuration
pub mod defaults {
    /// Backend base URL, including the API version segment
    pub const API_BASE_URL: &str = "http://localhost:8000/v1";
    /// File name of the persisted client configuration
    pub const CONFIG_FILE: &str = "flowpad.json";
    /// Number of executions kept by the recent-executions query
    pub const RECENT_EXECUTIONS: usize = 10;
}

/// Environment variables that override the config file
pub mod env {
    pub const API_BASE_URL: &str = "FLOW_API_BASE_URL";
    pub const OWNER_ID: &str = "FLOW_OWNER_ID";
    pub const REQUEST_TIMEOUT_SECS: &str = "FLOW_REQUEST_TIMEOUT_SECS";
}

/// Backend resource paths, relative to the base URL
pub mod paths {
    pub const WORKFLOWS: &str = "workflows";
    pub const RECENT_EXECUTIONS: &str = "workflow-executions/recent";
}
