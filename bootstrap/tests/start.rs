//! 运行时启动测试
//!
//! tracing subscriber 每个进程只能安装一次，所有断言放在同一个测试里

use figment::Jail;
use rpclog_bootstrap::{BootstrapError, RuntimeConfig, init_runtime, start};
use rpclog_config::LoggingConfig;
use rpclog_telemetry::Level;

#[test]
fn test_start_once() {
    Jail::expect_with(|jail| {
        jail.clear_env();
        jail.create_dir("config")?;
        jail.create_file(
            "config/default.toml",
            r#"
                app_name = "orders"

                [telemetry]
                log_level = "warn"

                [options]
                unary_message = "call"
            "#,
        )?;

        let (config, interceptor) = start(&RuntimeConfig::default()).expect("start");
        assert_eq!(config.app_name, "orders");
        assert_eq!(interceptor.options().unary_message, "call");
        assert!(interceptor.logger().enabled(Level::Error));
        assert!(!interceptor.logger().enabled(Level::Info));

        // 诊断日志与调用日志共用同一个记录器
        assert!(!rpclog_diagnostics::v(0));
        assert!(rpclog_diagnostics::v(1));

        let again = init_runtime(&LoggingConfig::default());
        assert!(matches!(again, Err(BootstrapError::Telemetry(_))));
        Ok(())
    });
}

#[test]
fn test_start_with_invalid_config() {
    Jail::expect_with(|jail| {
        jail.clear_env();
        jail.create_file("default.toml", "[telemetry]\njson = \"not a bool\"\n")?;

        let runtime = RuntimeConfig {
            config_dir: ".".to_string(),
        };
        assert!(matches!(start(&runtime), Err(BootstrapError::Config(_))));
        Ok(())
    });
}
