use clap::Parser;
use miette::Result;
use nimbus_reports::cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    // RUST_LOG wins; otherwise warnings only, or debug with -v
    let default_level = if global.verbose { "nimbus_reports=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    match cli.command {
        Commands::Groups(cmd) => nimbus_reports::cli::commands::groups::run(cmd, &global),
        Commands::Lookup(cmd) => nimbus_reports::cli::commands::lookup::run(cmd, &global),
        Commands::Status(args) => nimbus_reports::cli::commands::status::run(args, &global),
        Commands::Config(cmd) => nimbus_reports::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => nimbus_reports::cli::commands::completions::run(args),
    }
}
