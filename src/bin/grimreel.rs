use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

use grimreel::{
    AssetBundle, CancelToken, FfmpegRenderOpts, FfmpegRenderer, JsonStoryStore, PlanConfig,
    RenderAssets, RenderConsumer, RenderPlan, Stage, StoreStats, StoryRecord, StoryStore,
};

#[derive(Parser, Debug)]
#[command(name = "grimreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan a story and print (or write) the render plan JSON.
    Plan(PlanArgs),
    /// Write the subtitle cues of a story as SubRip.
    Subtitles(SubtitlesArgs),
    /// Plan and render an MP4 video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// List, inspect, search or export a story database.
    Stories(StoriesArgs),
}

#[derive(Args, Debug)]
struct PlanInput {
    /// Input asset bundle JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Pacing configuration JSON (defaults apply when omitted).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Language whose subtitle budgets apply (defaults to the bundle's language).
    #[arg(long)]
    language: Option<String>,
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[command(flatten)]
    input: PlanInput,

    /// Output plan JSON path; stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SubtitlesArgs {
    #[command(flatten)]
    input: PlanInput,

    /// Output `.srt` path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: PlanInput,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value_t = 1080)]
    width: u32,

    #[arg(long, default_value_t = 1920)]
    height: u32,

    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Do not burn subtitles into the picture.
    #[arg(long, default_value_t = false)]
    no_subtitles: bool,
}

#[derive(Args, Debug)]
struct StoriesArgs {
    /// Story database JSON.
    #[arg(long)]
    db: PathBuf,

    /// Print counts per completed stage, failures and word totals.
    #[arg(long, conflicts_with_all = ["id", "search", "export"])]
    stats: bool,

    /// Show one story in full.
    #[arg(long, conflicts_with_all = ["search", "export"])]
    id: Option<String>,

    /// List stories whose id, title or text contains this term.
    #[arg(long, conflicts_with = "export")]
    search: Option<String>,

    /// Write the database to this JSON file.
    #[arg(long)]
    export: Option<PathBuf>,

    /// Leave story text out of the export.
    #[arg(long, default_value_t = false, requires = "export")]
    no_content: bool,
}

fn main() -> anyhow::Result<()> {
    grimreel::logging::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Plan(args) => cmd_plan(args),
        Command::Subtitles(args) => cmd_subtitles(args),
        Command::Render(args) => cmd_render(args),
        Command::Stories(args) => cmd_stories(args),
    }
}

fn load_plan(input: &PlanInput) -> anyhow::Result<(AssetBundle, RenderPlan)> {
    let bundle = AssetBundle::from_path(&input.in_path)?;
    let config = match &input.config {
        Some(path) => PlanConfig::from_path(path)?,
        None => PlanConfig::default(),
    };
    let language = input
        .language
        .as_deref()
        .unwrap_or(&bundle.story.language);
    let params = config.params(language)?;
    let plan = grimreel::assemble_plan(&bundle, &params)?;
    tracing::info!(
        story_id = %bundle.story.id,
        fingerprint = %grimreel::fingerprint_plan(&plan),
        "plan ready"
    );
    Ok((bundle, plan))
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let (_, plan) = load_plan(&args.input)?;
    let json = plan.to_json()?;
    match args.out {
        Some(out) => {
            grimreel::encode::ffmpeg::ensure_parent_dir(&out)?;
            std::fs::write(&out, json + "\n")
                .with_context(|| format!("write plan '{}'", out.display()))?;
            eprintln!("wrote {}", out.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_subtitles(args: SubtitlesArgs) -> anyhow::Result<()> {
    let (_, plan) = load_plan(&args.input)?;
    grimreel::write_srt_file(&plan.subtitle_cues, &args.out)?;
    eprintln!(
        "wrote {} ({} cues)",
        args.out.display(),
        plan.subtitle_cues.len()
    );
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let (bundle, plan) = load_plan(&args.input)?;
    let root = args
        .input
        .in_path
        .parent()
        .unwrap_or_else(|| Path::new("."));

    let assets = RenderAssets {
        narration: root.join(&bundle.narration.handle),
        images: bundle
            .images
            .iter()
            .map(|img| {
                img.source
                    .as_deref()
                    .map(|s| root.join(s))
                    .with_context(|| format!("image {} has no source file", img.ordinal))
            })
            .collect::<anyhow::Result<_>>()?,
        music: bundle.effective_music().map(|m| root.join(&m.handle)),
    };

    let renderer = FfmpegRenderer::new(FfmpegRenderOpts {
        width: args.width,
        height: args.height,
        fps: args.fps,
        overwrite: true,
        burn_subtitles: !args.no_subtitles,
    });
    let out = renderer.render(&plan, &assets, &args.out, &CancelToken::new())?;
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_stories(args: StoriesArgs) -> anyhow::Result<()> {
    let store = JsonStoryStore::open(&args.db)?;
    let records = store.list()?;

    if args.stats {
        print_stats(&StoreStats::from_records(&records));
        return Ok(());
    }
    if let Some(id) = &args.id {
        let record = store
            .load(id)?
            .with_context(|| format!("no story with id '{id}' in '{}'", args.db.display()))?;
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }
    if let Some(out) = &args.export {
        let doc = grimreel::export_records(&records, !args.no_content, &args.db)?;
        grimreel::encode::ffmpeg::ensure_parent_dir(out)?;
        std::fs::write(out, serde_json::to_string_pretty(&doc)? + "\n")
            .with_context(|| format!("write export '{}'", out.display()))?;
        eprintln!("wrote {} ({} stories)", out.display(), records.len());
        return Ok(());
    }

    let shown: Vec<&StoryRecord> = match &args.search {
        Some(term) => grimreel::search_records(&records, term),
        None => records.iter().collect(),
    };
    for r in &shown {
        let stage = r.completed.map_or("new", |s| s.as_str());
        match &r.failure {
            Some(f) => println!("{}\t{stage}\tfailed at {}: {}", r.id, f.stage, f.message),
            None => println!("{}\t{stage}", r.id),
        }
    }
    eprintln!("{} stories", shown.len());
    Ok(())
}

fn print_stats(stats: &StoreStats) {
    println!("total\t{}", stats.total);
    println!("new\t{}", stats.not_started);
    for stage in Stage::ALL {
        println!("{stage}\t{}", stats.at_stage(stage));
    }
    println!("failed\t{}", stats.failed);
    println!("words\t{}", stats.total_words);
    println!("avg_words\t{:.0}", stats.average_words());
    if let (Some(first), Some(last)) = (stats.earliest_update, stats.latest_update) {
        println!("updated\t{} to {}", first.date_naive(), last.date_naive());
    }
}
