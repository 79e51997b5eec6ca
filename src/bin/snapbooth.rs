use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use snapbooth::{
    AssetLoader as _, CaptureOpts, CodeStore as _, CompositeOutcome, CompositeRequest, EditConfig,
    EditSession, FlowState, FontBook, FsAssetLoader, InMemoryCodeStore, LoadedTemplate,
    Orientation, RenderContext, SlotDetectOpts, TemplateSpec,
};

#[derive(Parser, Debug)]
#[command(name = "snapbooth", version)]
struct Cli {
    /// Log engine events (slot detection, cache hits, superseded renders) to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect the transparent slots of a template and print them as JSON.
    Detect(DetectArgs),
    /// Composite the photos of a flow record into its template.
    Compose(ComposeArgs),
    /// Cover-fit a photo onto a print canvas.
    Normalize(NormalizeArgs),
    /// Consume one use of an access code from a JSON code list.
    Redeem(RedeemArgs),
}

#[derive(Parser, Debug)]
struct DetectArgs {
    /// Template PNG.
    #[arg(long)]
    template: PathBuf,

    /// Template display name (drives the template class). Defaults to the file stem.
    #[arg(long)]
    name: Option<String>,

    /// Declared pose count.
    #[arg(long, default_value_t = 1)]
    poses: u32,

    /// Maximum number of slots to keep.
    #[arg(long)]
    max_slots: Option<usize>,
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Flow record JSON; photo and template locators resolve against its directory.
    #[arg(long)]
    flow: PathBuf,

    /// Edit configuration JSON (defaults to the snapshot stored in the flow record).
    #[arg(long)]
    edit: Option<PathBuf>,

    /// Font for text annotations, as FAMILY=PATH (regular face) or FAMILY:bold=PATH.
    /// May be repeated.
    #[arg(long = "font", value_name = "FAMILY[:bold]=PATH")]
    fonts: Vec<String>,

    /// Render the live preview (template resolution, no tint, no text) instead of the final.
    #[arg(long, default_value_t = false)]
    preview: bool,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct NormalizeArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Print orientation.
    #[arg(long, value_enum, default_value_t = OrientationChoice::Portrait)]
    orientation: OrientationChoice,

    /// Override the target width (requires --height).
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Override the target height (requires --width).
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Mirror horizontally.
    #[arg(long, default_value_t = false)]
    mirror: bool,

    /// Convert to black and white.
    #[arg(long, default_value_t = false)]
    bw: bool,
}

#[derive(Parser, Debug)]
struct RedeemArgs {
    /// JSON code list; rewritten with the updated use count.
    #[arg(long)]
    codes: PathBuf,

    /// Code to redeem.
    code: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OrientationChoice {
    Portrait,
    Landscape,
}

impl From<OrientationChoice> for Orientation {
    fn from(c: OrientationChoice) -> Self {
        match c {
            OrientationChoice::Portrait => Orientation::Portrait,
            OrientationChoice::Landscape => Orientation::Landscape,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Detect(args) => cmd_detect(args),
        Command::Compose(args) => cmd_compose(args),
        Command::Normalize(args) => cmd_normalize(args),
        Command::Redeem(args) => cmd_redeem(args),
    }
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("'{}' has no file name", path.display()))
}

fn write_output(out: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(out, bytes).with_context(|| format!("write '{}'", out.display()))?;
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_detect(args: DetectArgs) -> anyhow::Result<()> {
    let locator = file_name(&args.template)?;
    let name = args.name.unwrap_or_else(|| {
        args.template
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    let mut loader = FsAssetLoader::new(parent_dir(&args.template));
    let image = loader.load_image(&locator)?;
    let canvas = image.canvas();

    let mut opts = SlotDetectOpts::default();
    if let Some(max) = args.max_slots {
        opts.max_slots = max;
    }
    let template =
        LoadedTemplate::prepare(TemplateSpec::new(locator, name, args.poses), image, &opts);

    let report = serde_json::json!({
        "canvas": canvas,
        "class": template.class,
        "slots": template.slots,
        "grid": template.grid,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.flow)
        .with_context(|| format!("read flow record '{}'", args.flow.display()))?;
    let flow = FlowState::from_json(&raw).context("parse flow record")?;
    let mut loader = FsAssetLoader::new(parent_dir(&args.flow));

    let png = if args.preview {
        let mut ctx = RenderContext::default();
        let request = CompositeRequest::preview(flow.template_spec()?, flow.photos.clone());
        match snapbooth::composite(&mut ctx, &mut loader, &request)? {
            CompositeOutcome::Committed(report) => {
                eprintln!(
                    "composited {} photo draw(s) into {} slot(s)",
                    report.draws.len(),
                    report.slots
                );
            }
            CompositeOutcome::Superseded => anyhow::bail!("preview render was superseded"),
        }
        ctx.committed_frame()
            .context("preview produced no frame")?
            .to_png()?
    } else {
        let edit = match &args.edit {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("read edit config '{}'", path.display()))?;
                Some(EditConfig::from_json(&raw).context("parse edit config")?)
            }
            None => flow.edit.clone(),
        };

        let mut fonts = FontBook::new();
        for spec in &args.fonts {
            let (family, path) = spec
                .split_once('=')
                .with_context(|| format!("font '{spec}' must be FAMILY[:bold]=PATH"))?;
            let (family, bold) = match family.rsplit_once(':') {
                Some((name, weight)) if weight.eq_ignore_ascii_case("bold") => (name, true),
                _ => (family, false),
            };
            fonts.load_file_weighted(family, bold, Path::new(path))?;
        }

        let mut session = EditSession::restore(flow, edit, fonts);
        session.render(&mut loader)?;
        session.export_png()?
    };

    write_output(&args.out, &png)
}

fn cmd_normalize(args: NormalizeArgs) -> anyhow::Result<()> {
    let mut loader = FsAssetLoader::new(parent_dir(&args.in_path));
    let src = loader.load_image(&file_name(&args.in_path)?)?;

    let target = match (args.width, args.height) {
        (Some(w), Some(h)) => snapbooth::Canvas::new(w, h)?,
        _ => snapbooth::Canvas::for_orientation(args.orientation.into()),
    };
    let opts = CaptureOpts {
        mirror: args.mirror,
        monochrome: args.bw,
    };
    let photo = snapbooth::normalize_photo(&src, target, opts)?;
    let png =
        snapbooth::assets::decode::encode_png(photo.width, photo.height, &photo.rgba8_premul)?;

    write_output(&args.out, &png)
}

fn cmd_redeem(args: RedeemArgs) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.codes)
        .with_context(|| format!("read code list '{}'", args.codes.display()))?;
    let store = InMemoryCodeStore::from_json(&raw).context("parse code list")?;

    let grant = store.validate_and_consume(&args.code)?;
    let pass = snapbooth::AccessPass::issue(grant, snapbooth::access::code_store::now_ms());

    std::fs::write(&args.codes, store.to_json()?)
        .with_context(|| format!("write code list '{}'", args.codes.display()))?;
    println!("{}", serde_json::to_string_pretty(&pass)?);
    Ok(())
}
