//! # release-notify
//!
//! Publishes a built application package and tells people about it.
//!
//! One run locates the package in a release directory, uploads it to
//! Dropbox, extracts the newest entry of a changelog, renders an email
//! template with it and posts the email to a Zapier webhook. Any failing
//! stage aborts the run.
//!
//! ## Quick Start
//!
//! ```rust
//! use release_notify::changelog::parse_latest;
//! use release_notify::template::{EmailTemplate, ReleaseContext};
//!
//! let entry = parse_latest("# Version 1.05\n\nRemoved Google Maps Fragment\n##\n").unwrap();
//! let template = EmailTemplate::parse("#subject\n{app_name} {app_version}\n#body\n{change_log}").unwrap();
//! let email = template.render(&ReleaseContext {
//!     app_name: "CoolApp".to_string(),
//!     app_version: entry.version().unwrap(),
//!     download_url: String::new(),
//!     changelog_text: entry.body_text(),
//! });
//! assert_eq!(email.subject, "CoolApp 1.05");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod artifact;
pub mod changelog;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod notify;
pub mod pipeline;
pub mod storage;
pub mod template;

pub use crate::cli::Cli;
pub use crate::config::ReleaseConfig;
pub use crate::error::ReleaseError;
pub use crate::pipeline::{ReleasePipeline, ReleaseSummary};
