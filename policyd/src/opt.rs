use std::path::PathBuf;

/// Command-line surface (spec §6 "CLI (thin external collaborator,
/// summarized only)"): daemonization, pidfile handling, and privilege
/// dropping stay external collaborators per spec §1's Non-goals, so this
/// only carries the flags far enough to parse them and hand the
/// meaningful ones (`config`, `port`, `socketfile`, `check_conf`) to
/// [`crate::run`]; `pid_file`, `foreground` and `unsafe_` are recorded
/// and logged but otherwise left to whatever process supervisor wraps
/// this binary, the same way `kannader::Opt` leaves TLS certificate
/// provisioning to its caller.
#[derive(structopt::StructOpt)]
#[structopt(
    name = "policyd",
    about = "A Postfix policy-delegation daemon: filter graph, greylisting, SPF."
)]
pub struct Opt {
    /// Path to the filter-graph configuration file
    #[structopt(short, long, parse(from_os_str), default_value = "/etc/policyd/policyd.conf")]
    pub config: PathBuf,

    /// TCP port to listen on, overriding the configuration file's `port`
    #[structopt(long)]
    pub port: Option<u16>,

    /// Unix-domain socket path to listen on, overriding the
    /// configuration file's `socketfile`
    #[structopt(long)]
    pub socketfile: Option<String>,

    /// Path to write the daemon's pid to
    #[structopt(long, parse(from_os_str))]
    pub pid_file: Option<PathBuf>,

    /// Stay attached to the controlling terminal instead of
    /// daemonizing (daemonizing itself is not implemented here; this
    /// only suppresses the "would normally background" log line)
    #[structopt(long)]
    pub foreground: bool,

    /// Increase logging verbosity; may be repeated (-v, -vv, -vvv)
    #[structopt(short, long, parse(from_occurrences))]
    pub verbose: u8,

    /// Skip privilege dropping (privilege dropping is an external
    /// collaborator per spec §1 and is not implemented; this flag only
    /// controls whether a warning is logged about running as-is)
    #[structopt(long = "unsafe")]
    pub unsafe_: bool,

    /// Parse the configuration, print any error, and exit non-zero on
    /// failure without starting the listener
    #[structopt(long)]
    pub check_conf: bool,
}

impl Opt {
    /// `RUST_LOG`-style filter directive matching `--verbose`'s count,
    /// layered under a baseline of `warn` (0), `info` (1), `debug` (2),
    /// or `trace` (3+) — the same escalation `kannader::run` documents
    /// for its own `-v` flag.
    pub fn tracing_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use structopt::StructOpt;

    #[test]
    fn defaults_to_the_standard_config_path() {
        let opt = Opt::from_iter(&["policyd"]);
        assert_eq!(opt.config, PathBuf::from("/etc/policyd/policyd.conf"));
        assert_eq!(opt.port, None);
        assert!(!opt.check_conf);
        assert_eq!(opt.tracing_filter(), "warn");
    }

    #[test]
    fn repeated_verbose_flags_raise_the_tracing_level() {
        let opt = Opt::from_iter(&["policyd", "-vv"]);
        assert_eq!(opt.verbose, 2);
        assert_eq!(opt.tracing_filter(), "debug");
    }

    #[test]
    fn port_and_socketfile_overrides_parse() {
        let opt = Opt::from_iter(&[
            "policyd",
            "--port",
            "10030",
            "--socketfile",
            "/run/policyd.sock",
            "--check-conf",
        ]);
        assert_eq!(opt.port, Some(10030));
        assert_eq!(opt.socketfile.as_deref(), Some("/run/policyd.sock"));
        assert!(opt.check_conf);
    }
}
