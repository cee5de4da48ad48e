use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 終端機用的精簡輸出
    #[default]
    Compact,
    /// 伺服器部署用 JSON 格式，方便集中收集日誌
    Json,
}

/// `RUST_LOG` wins over the verbosity flag.
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "automation_catalog=debug,info"
    } else {
        "automation_catalog=info"
    }
}

pub fn init_logger(format: LogFormat, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));
    let layer = tracing_subscriber::fmt::layer()
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(layer.with_target(false).compact())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(layer.with_target(true).json())
            .init(),
    }
}
