use std::sync::Once;

static TRACING_INIT: Once = Once::new();

const DEFAULT_DIRECTIVE: &str = "cashbook=info";

/// Initializes the global tracing subscriber. `RUST_LOG` directives are kept;
/// the crate's own events default to `info`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let mut filter = EnvFilter::from_default_env();
        for directive in [DEFAULT_DIRECTIVE, "cashbook_core=info"] {
            if let Ok(directive) = directive.parse() {
                filter = filter.add_directive(directive);
            }
        }

        let _ = fmt().with_env_filter(filter).try_init();
    });
}
