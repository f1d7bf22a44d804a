//! 诊断日志接口与适配器

use std::fmt::{self, Display, Write};
use std::sync::Arc;

use rpclog_telemetry::{Level, LogEntry, StructuredLogger};

/// 框架诊断日志接口
///
/// 普通与 `ln` 变体把参数直接拼接（不加分隔符），`f` 变体接收格式化参数。
/// `print` 系列是 `info` 系列的别名。
pub trait DiagnosticLogger: Send + Sync {
    fn info(&self, args: &[&dyn Display]);
    fn infof(&self, args: fmt::Arguments<'_>);
    fn infoln(&self, args: &[&dyn Display]);

    fn warning(&self, args: &[&dyn Display]);
    fn warningf(&self, args: fmt::Arguments<'_>);
    fn warningln(&self, args: &[&dyn Display]);

    fn error(&self, args: &[&dyn Display]);
    fn errorf(&self, args: fmt::Arguments<'_>);
    fn errorln(&self, args: &[&dyn Display]);

    /// 记录后结束进程
    fn fatal(&self, args: &[&dyn Display]) -> !;
    fn fatalf(&self, args: fmt::Arguments<'_>) -> !;
    fn fatalln(&self, args: &[&dyn Display]) -> !;

    fn print(&self, args: &[&dyn Display]) {
        self.info(args)
    }

    fn printf(&self, args: fmt::Arguments<'_>) {
        self.infof(args)
    }

    fn println(&self, args: &[&dyn Display]) {
        self.infoln(args)
    }

    /// verbosity 判断：0 info，1 warning，2 error，3 fatal
    ///
    /// # Panics
    ///
    /// 其它级别视为调用方违约，直接 panic
    fn v(&self, level: i32) -> bool;
}

/// 拼接参数，不加分隔符
pub fn concat(args: &[&dyn Display]) -> String {
    let mut message = String::new();
    for arg in args {
        // 写入 String 不会失败
        let _ = write!(message, "{}", arg);
    }
    message
}

/// verbosity 对应的日志级别
pub fn verbosity_level(level: i32) -> Level {
    match level {
        0 => Level::Info,
        1 => Level::Warn,
        2 => Level::Error,
        3 => Level::Fatal,
        _ => panic!("unhandled gRPC logger level"),
    }
}

/// 基于 [`StructuredLogger`] 的诊断日志适配器
///
/// 输出的记录只有级别和消息
#[derive(Clone)]
pub struct DiagnosticAdapter {
    logger: Arc<dyn StructuredLogger>,
}

impl DiagnosticAdapter {
    pub fn new(logger: Arc<dyn StructuredLogger>) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Arc<dyn StructuredLogger> {
        &self.logger
    }

    fn emit(&self, level: Level, message: &str) {
        self.logger.log(level, LogEntry::new(), message);
    }

    fn emit_fatal(&self, message: &str) -> ! {
        self.emit(Level::Fatal, message);
        std::process::exit(1)
    }
}

impl DiagnosticLogger for DiagnosticAdapter {
    fn info(&self, args: &[&dyn Display]) {
        self.emit(Level::Info, &concat(args));
    }

    fn infof(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Info, &args.to_string());
    }

    fn infoln(&self, args: &[&dyn Display]) {
        self.info(args);
    }

    fn warning(&self, args: &[&dyn Display]) {
        self.emit(Level::Warn, &concat(args));
    }

    fn warningf(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Warn, &args.to_string());
    }

    fn warningln(&self, args: &[&dyn Display]) {
        self.warning(args);
    }

    fn error(&self, args: &[&dyn Display]) {
        self.emit(Level::Error, &concat(args));
    }

    fn errorf(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Error, &args.to_string());
    }

    fn errorln(&self, args: &[&dyn Display]) {
        self.error(args);
    }

    fn fatal(&self, args: &[&dyn Display]) -> ! {
        self.emit_fatal(&concat(args))
    }

    fn fatalf(&self, args: fmt::Arguments<'_>) -> ! {
        self.emit_fatal(&args.to_string())
    }

    fn fatalln(&self, args: &[&dyn Display]) -> ! {
        self.fatal(args)
    }

    fn v(&self, level: i32) -> bool {
        verbosity_level(level).passes(self.logger.min_level())
    }
}

impl fmt::Debug for DiagnosticAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("min_level", &self.logger.min_level())
            .finish()
    }
}
