use std::sync::Once;

static INIT: Once = Once::new();

/// Install the process logger. `RUST_LOG` wins when set; otherwise `info`, with
/// wgpu's internals held to `warn`. Safe to call more than once.
pub fn init() {
    INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or("info,wgpu_core=warn,wgpu_hal=warn,naga=warn");
        let _ = env_logger::Builder::from_env(env).format_timestamp_millis().try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init();
        init();
        log::info!("logger installed");
    }
}
