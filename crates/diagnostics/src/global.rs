//! 进程级诊断日志
//!
//! 框架侧只能通过全局入口写诊断日志，这里保存当前安装的记录器，
//! 后安装的覆盖先安装的。

use std::fmt::{self, Display};
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use rpclog_telemetry::default_logger;
use tracing::debug;

use crate::adapter::{DiagnosticAdapter, DiagnosticLogger};

static DIAGNOSTIC_LOGGER: Lazy<RwLock<Arc<dyn DiagnosticLogger>>> =
    Lazy::new(|| RwLock::new(Arc::new(DiagnosticAdapter::new(default_logger()))));

/// 安装诊断日志记录器
pub fn set_diagnostic_logger(logger: Arc<dyn DiagnosticLogger>) {
    let mut slot = DIAGNOSTIC_LOGGER
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    *slot = logger;
    debug!("Diagnostic logger installed");
}

/// 安装基于默认记录器的适配器
pub fn set_new_diagnostic_logger() {
    set_diagnostic_logger(Arc::new(DiagnosticAdapter::new(default_logger())));
}

/// 当前安装的诊断日志记录器
pub fn diagnostic_logger() -> Arc<dyn DiagnosticLogger> {
    DIAGNOSTIC_LOGGER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub fn info(args: &[&dyn Display]) {
    diagnostic_logger().info(args);
}

pub fn infof(args: fmt::Arguments<'_>) {
    diagnostic_logger().infof(args);
}

pub fn infoln(args: &[&dyn Display]) {
    diagnostic_logger().infoln(args);
}

pub fn warning(args: &[&dyn Display]) {
    diagnostic_logger().warning(args);
}

pub fn warningf(args: fmt::Arguments<'_>) {
    diagnostic_logger().warningf(args);
}

pub fn warningln(args: &[&dyn Display]) {
    diagnostic_logger().warningln(args);
}

pub fn error(args: &[&dyn Display]) {
    diagnostic_logger().error(args);
}

pub fn errorf(args: fmt::Arguments<'_>) {
    diagnostic_logger().errorf(args);
}

pub fn errorln(args: &[&dyn Display]) {
    diagnostic_logger().errorln(args);
}

pub fn fatal(args: &[&dyn Display]) -> ! {
    diagnostic_logger().fatal(args)
}

pub fn fatalf(args: fmt::Arguments<'_>) -> ! {
    diagnostic_logger().fatalf(args)
}

pub fn fatalln(args: &[&dyn Display]) -> ! {
    diagnostic_logger().fatalln(args)
}

/// 当前记录器的 verbosity 判断
pub fn v(level: i32) -> bool {
    diagnostic_logger().v(level)
}
