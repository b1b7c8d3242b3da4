use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use monument_export_core::{
    app_paths, load_config, save_config, AppConfig, ExportOptions, Exporter, RunStatistics,
};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_ENV: &str = "MONUMENT_EXPORT_LOG";

#[derive(Debug, Parser)]
#[command(name = "monument-export", version)]
#[command(about = "Exports a Monument photo catalog into a user/album folder tree")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Export(ExportArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    /// Write the default settings to the config file
    Init {
        /// Replace an existing config file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// Root of the Monument installation
    #[arg(long)]
    source: PathBuf,
    /// Directory the export tree is written to
    #[arg(long)]
    dest: PathBuf,
    /// One directory level per album instead of the folder hierarchy
    #[arg(long, default_value_t = false)]
    flatten: bool,
    /// Also export edited versions as `<name>_edited.<ext>`
    #[arg(long, default_value_t = false)]
    save_edits: bool,
    /// Write captions into the EXIF description
    #[arg(long, default_value_t = false)]
    save_comments: bool,
    #[arg(long, default_value_t = false)]
    export_gps: bool,
    /// Write a `Keywords:` line into the EXIF description
    #[arg(long, default_value_t = false)]
    export_tags: bool,
    /// Additional copy per tag under `<user>/tags/Tag_<name>/`
    #[arg(long, default_value_t = false)]
    tags_as_folders: bool,
    #[arg(long, default_value_t = false)]
    dryrun: bool,
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Export(args) => cmd_export(args),
        Commands::Config(config) => match config.action {
            ConfigAction::Show => cmd_config_show(),
            ConfigAction::Init { force } => cmd_config_init(force),
        },
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(filter).with_target(false).init();
}

fn cmd_export(args: ExportArgs) -> Result<()> {
    init_logging(args.verbose);

    let config = load_config()?;
    let mut options = ExportOptions::from_config(args.source, args.dest, &config);
    // Flags only ever switch options on; the config file supplies the rest.
    options.flatten |= args.flatten;
    options.save_edits |= args.save_edits;
    options.save_comments |= args.save_comments;
    options.export_gps |= args.export_gps;
    options.export_tags |= args.export_tags;
    options.tags_as_folders |= args.tags_as_folders;
    options.dry_run = args.dryrun;

    options.validate()?;

    if !options.dry_run && !options.destination.exists() {
        tracing::info!(
            "creating destination directory: {}",
            options.destination.display()
        );
        fs::create_dir_all(&options.destination).with_context(|| {
            format!(
                "could not create destination directory: {}",
                options.destination.display()
            )
        })?;
    }

    print_banner(&options);

    let exporter = Exporter::open(options)?;
    tracing::info!("catalog: {}", exporter.options().catalog_path().display());
    let stats = exporter.run()?;

    match args.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        OutputFormat::Table => {
            print_table(&stats);
        }
    }

    if exporter.options().dry_run {
        eprintln!("dry run: no files were written.");
    }

    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let paths = app_paths()?;
    println!("config file: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_config_init(force: bool) -> Result<()> {
    let paths = app_paths()?;
    if paths.config_path.exists() && !force {
        anyhow::bail!(
            "config file already exists: {} (use --force to replace it)",
            paths.config_path.display()
        );
    }
    save_config(&AppConfig::default())?;
    println!("wrote {}", paths.config_path.display());
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "YES"
    } else {
        "NO"
    }
}

fn print_banner(options: &ExportOptions) {
    let rule = "=".repeat(48);
    println!("{rule}");
    println!(" Monument Photo Exporter v{}", env!("CARGO_PKG_VERSION"));
    println!("{rule}");
    println!("  Source               : {}", options.source.display());
    println!("  Destination          : {}", options.destination.display());
    println!("  Flatten structure    : {}", yes_no(options.flatten));
    println!("  Export edited files  : {}", yes_no(options.save_edits));
    println!("  Save comments to EXIF: {}", yes_no(options.save_comments));
    println!("  Export GPS to EXIF   : {}", yes_no(options.export_gps));
    println!("  Export tags to EXIF  : {}", yes_no(options.export_tags));
    println!("  Tags as folders      : {}", yes_no(options.tags_as_folders));
    println!("  Dry run mode         : {}", yes_no(options.dry_run));
    println!("{rule}");
}

fn print_table(stats: &RunStatistics) {
    println!("album -> files");
    for (album, count) in &stats.per_album {
        println!("{album} -> {count}");
    }
    if !stats.per_tag.is_empty() {
        println!("\ntag folder -> copies");
        for (tag, count) in &stats.per_tag {
            println!("{tag} -> {count}");
        }
    }

    println!(
        "\nsummary: seen={} processed={} exported={} renamed={} missing={} skipped={} owner_changed={}",
        stats.records_seen,
        stats.records_processed(),
        stats.files_exported,
        stats.files_renamed,
        stats.missing_sources,
        stats.records_skipped,
        stats.ownership_changes
    );
    println!(
        "metadata: gps={} captions={} tags={} truncated={} failed={}",
        stats.gps_written,
        stats.captions_written,
        stats.tags_written,
        stats.truncated_writes,
        stats.metadata_failures
    );
    println!(
        "extras: tag_copies={} tag_failures={} edited={} edited_failures={}",
        stats.tag_copies, stats.tag_copy_failures, stats.edited_exported, stats.edited_failures
    );
}
