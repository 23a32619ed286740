use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "koma", version)]
struct Cli {
    /// Log progress and recovered render failures to stderr.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a project's pages to PNG or PDF.
    Export(ExportArgs),
    /// List a project's pages.
    Pages(PagesArgs),
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Directory holding `<project>.json` files.
    #[arg(long)]
    project_dir: PathBuf,

    /// Project id.
    #[arg(long)]
    project: String,

    /// Output format. PNG is only produced when exactly one page is selected.
    #[arg(long, value_enum, default_value_t = FormatChoice::Pdf)]
    format: FormatChoice,

    /// Encoder quality in 0..=1.
    #[arg(long, default_value_t = 0.95)]
    quality: f64,

    /// Integer oversampling factor.
    #[arg(long, default_value_t = 3)]
    resolution: u32,

    /// Page id to export; repeat to select several, in output order.
    #[arg(long = "page")]
    pages: Vec<String>,

    /// Output file.
    #[arg(long)]
    out: PathBuf,

    /// Root for relative image paths (defaults to the project directory).
    #[arg(long)]
    assets_root: Option<PathBuf>,

    /// PDF title.
    #[arg(long)]
    title: Option<String>,
}

#[derive(Parser, Debug)]
struct PagesArgs {
    /// Directory holding `<project>.json` files.
    #[arg(long)]
    project_dir: PathBuf,

    /// Project id.
    #[arg(long)]
    project: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Png,
    Pdf,
}

impl From<FormatChoice> for koma::ExportFormat {
    fn from(c: FormatChoice) -> Self {
        match c {
            FormatChoice::Png => koma::ExportFormat::Png,
            FormatChoice::Pdf => koma::ExportFormat::Pdf,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    }
    match cli.cmd {
        Command::Export(args) => cmd_export(args),
        Command::Pages(args) => cmd_pages(args),
    }
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let source = koma::JsonPageSource::new(&args.project_dir);
    let assets_root = args
        .assets_root
        .clone()
        .unwrap_or_else(|| args.project_dir.clone());
    let loader = Arc::new(koma::ImageLoader::with_assets_root(assets_root));

    let mut request = koma::ExportRequest::new(&args.project)
        .with_format(args.format.into())
        .with_quality(args.quality)
        .with_resolution(args.resolution);
    if !args.pages.is_empty() {
        request = request.with_page_ids(args.pages.iter().cloned());
    }
    let title = match &args.title {
        Some(t) => t.clone(),
        None => {
            let project = source.read_project(&args.project)?;
            if project.title.is_empty() {
                args.project.clone()
            } else {
                project.title
            }
        }
    };
    request.metadata = request.metadata.with_title(title);

    let mut last_pct = u32::MAX;
    let out = koma::export_pages(&source, loader, &request, &mut |f| {
        let pct = (f * 100.0).round() as u32;
        if pct != last_pct && pct % 10 == 0 {
            last_pct = pct;
            tracing::info!(progress = pct, "rendering");
        }
    })?;

    std::fs::write(&args.out, &out.bytes)
        .with_context(|| format!("write output '{}'", args.out.display()))?;
    eprintln!(
        "wrote {} ({} page(s), {}, {} bytes)",
        args.out.display(),
        out.page_count,
        out.mime,
        out.bytes.len()
    );
    Ok(())
}

fn cmd_pages(args: PagesArgs) -> anyhow::Result<()> {
    let source = koma::JsonPageSource::new(&args.project_dir);
    let pages = koma::PageSource::fetch_all_pages(&source, &args.project)?;
    for page in &pages {
        let panels = page.elements.iter().filter(|e| e.is_panel()).count();
        println!(
            "{:>3}  {:<24} {:<32} {} element(s), {} panel(s)",
            page.page_number,
            page.id,
            page.title,
            page.elements.len(),
            panels
        );
    }
    Ok(())
}
