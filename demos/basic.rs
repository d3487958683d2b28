use svc_log::{
    log_critical, log_debug, log_error, log_info, log_trace, log_warn, ExecutableName, LogConfig,
};

fn main() {
    // The sink and log root can be overridden with the `SVC_LOG` and `SVC_LOG_DIR` environment
    // variables. Debug builds log to STDERR, release builds to files.
    let exe_name = ExecutableName::new("basic").expect("Not a valid executable name");
    svc_log::configure(LogConfig::from_environment(exe_name))
        .expect("Logging has already been configured");

    // Surfacing the error here is the only way to find out the log directory can't be created,
    // the macros just drop their records in that case
    if svc_log::global_config().sink == svc_log::SinkChoice::RotatingFile {
        match svc_log::log_directory() {
            Ok(dir) => eprintln!("Logging to '{}'", dir.display()),
            Err(err) => {
                eprintln!("{err}");
                std::process::exit(1);
            }
        }
    }

    log_critical!("This is a critical error");
    log_error!("This is an error");
    log_warn!("This is a warning");
    log_info!("This is a regular log message");
    log_debug!("This is a debug message, hidden by the default threshold");
    log_trace!("This is a trace message, written to the trace logger");

    // Dependencies using the `log` crate end up in the same place
    log::info!("Logged through the log crate");
}
