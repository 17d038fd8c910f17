//! Tracing initialization for the flowc driver.
//!
//! Controlled by environment variables:
//! - `FLOWC_LOG`: filter string (`RUST_LOG` syntax). Falls back to
//!   `RUST_LOG`.
//! - `FLOWC_LOG_TREE`: set to any value to enable hierarchical tree output.
//!
//! When neither `FLOWC_LOG` nor `RUST_LOG` is set, defaults to `warn`.
//! Library crates (`flow_cfg`, `flow_analysis`, `flow_opt`) only ever emit
//! events — this is the one place in the workspace that installs a
//! subscriber.

use std::sync::OnceLock;
use tracing_subscriber::{prelude::*, EnvFilter, Registry};

static INIT: OnceLock<()> = OnceLock::new();

/// Initializes the tracing subscriber. Safe to call more than once — only
/// the first call takes effect.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_env("FLOWC_LOG")
            .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        let use_tree = std::env::var("FLOWC_LOG_TREE").is_ok();

        if use_tree {
            Registry::default()
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_indent_lines(true)
                        .with_deferred_spans(true)
                        .with_bracketed_fields(true)
                        .with_writer(std::io::stderr),
                )
                .with(filter)
                .init();
        } else {
            Registry::default()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(true)
                        .with_writer(std::io::stderr)
                        .compact(),
                )
                .with(filter)
                .init();
        }
    });
}
