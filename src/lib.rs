//! # OpenIKT Web
//!
//! Client core for the OpenIKT quilt diff and OS image comparison service.
//!
//! ## Features
//!
//! - **Request wrapper**: one HTTP client with a base URL, timeout, CSRF
//!   forwarding and centralized error reporting
//! - **Interceptors**: ordered request and response hooks, global and per call
//! - **Backend API**: typed functions for every account, quilt diff and
//!   image comparison endpoint
//! - **Router**: the client route table with titles, menu highlighting and
//!   history navigation
//! - **Dev server**: static hosting plus an API proxy for local work
//!
//! ## Modules
//!
//! - [`request`]: The `IktRequest` wrapper and its interceptors
//! - [`api`]: Endpoint functions grouped by backend application
//! - [`router`]: Route table and navigation
//! - [`services`]: Application wiring of the above
//! - [`utils`]: Name initials and file downloads
//! - [`config`]: TOML configuration with environment overrides
//! - [`devserver`]: Development server
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use openikt_web::api::quilt_diff;
//! use openikt_web::request::TracingNotifier;
//! use openikt_web::{Config, Services};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let services = Services::new(&Config::default(), Arc::new(TracingNotifier))?;
//!
//!     let repos = quilt_diff::get_repository_list(services.request()).await?;
//!     for repo in repos.data {
//!         println!("{}", repo.label);
//!     }
//!
//!     let route = services.router().push("/quiltdiff/details/7").await?;
//!     println!("{:?}", route.meta.menu_index);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod devserver;
pub mod request;
pub mod router;
pub mod services;
pub mod utils;

pub use api::{Envelope, LabelValue, TableData};

pub use config::{
    ApiConfig, Config, ConfigError, DevServerConfig, DownloadsConfig, LoggingConfig, RouterConfig,
};

pub use devserver::DevServerError;

pub use request::{
    ExportFile, IktRequest, Interceptors, RequestConfig, RequestError, RequestSettings, Response,
    ResponseData, ResponseType,
};

pub use router::{Page, Route, Router, RouterError};

pub use services::{ServiceError, Services};
