use carmo_cover::batch::{self, BatchOptions};
use carmo_cover::config::{self, CoverConfig};
use carmo_cover::pipeline::Pipeline;
use carmo_cover::resolver::{FieldResolver, FieldStore, NullResolver};
use carmo_cover::scope::{FixedScopeId, RandomScopeIds, ScopeId, ScopeIdSource};
use carmo_cover::types::BlockDescriptor;
use carmo_cover::{logging, output, switcher};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "carmo-cover")]
#[command(about = "Desktop/mobile background images for cover blocks")]
#[command(long_about = "\
Desktop/mobile background images for cover blocks

Each cover block names two image fields in its attributes. At render time
the fields are resolved to URLs and the block's outer element gets:

  - an inline background-image with the desktop image (works without JS)
  - when the mobile image differs: a scoped <style> rule pinning the desktop
    image at 768px and up, a per-render scope attribute, and data-mobile-bg

The switcher script swaps to data-mobile-bg below 768px and restores the
original background above it.

Block-tree layout for render-dir:

  blocks/
  ├── 010-hero.html   # rendered block fragment
  ├── 010-hero.json   # {\"blockName\": \"core/cover\", \"attrs\": {...}}
  └── 020-plain.html  # no sidecar = passed through unchanged

Run 'carmo-cover gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory containing config.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// JSON field store (field id → image). Without it every field misses
    #[arg(long, global = true)]
    fields: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log JSON lines to stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render one fragment and print the result
    Render {
        /// Fragment file, or '-' for stdin
        fragment: PathBuf,
        /// Block descriptor as JSON
        #[arg(long, conflicts_with_all = ["desktop_field", "mobile_field"])]
        block: Option<String>,
        /// Desktop field identifier
        #[arg(long)]
        desktop_field: Option<String>,
        /// Mobile field identifier
        #[arg(long)]
        mobile_field: Option<String>,
        /// Use this scope identifier instead of a random one
        #[arg(long)]
        scope_id: Option<String>,
    },
    /// Render a directory of fragments into an output directory
    RenderDir {
        input: PathBuf,
        output: PathBuf,
        /// Also write index.html showing every block with the switcher
        #[arg(long)]
        preview: bool,
        /// Worker threads (default: one per core)
        #[arg(short, long)]
        jobs: Option<usize>,
    },
    /// Replay viewport widths over rendered HTML and show the backgrounds
    Simulate {
        file: PathBuf,
        #[arg(long, value_delimiter = ',', default_values_t = [1280, 500])]
        widths: Vec<u32>,
    },
    /// Print the browser switcher script
    Script,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_json, cli.verbose, cli.quiet)?;

    match cli.command {
        Command::Render {
            fragment,
            block,
            desktop_field,
            mobile_field,
            scope_id,
        } => {
            let config = config::load_config(&cli.config_dir)?;
            let ids: Arc<dyn ScopeIdSource> = match scope_id {
                Some(id) => Arc::new(FixedScopeId(ScopeId::new(id))),
                None => Arc::new(RandomScopeIds),
            };
            let pipeline = Pipeline::for_config(&config, load_resolver(cli.fields.as_deref())?, ids);
            let block = match block {
                Some(json) => serde_json::from_str(&json)?,
                None => field_block(&config, desktop_field, mobile_field),
            };
            let fragment = read_fragment(&fragment)?;
            print!("{}", pipeline.render(&fragment, &block));
        }
        Command::RenderDir {
            input,
            output: output_dir,
            preview,
            jobs,
        } => {
            let config = config::load_config(&cli.config_dir)?;
            let pipeline = Pipeline::for_config(
                &config,
                load_resolver(cli.fields.as_deref())?,
                Arc::new(RandomScopeIds),
            );
            let report = batch::render_dir(
                &pipeline,
                &input,
                &output_dir,
                &BatchOptions { preview, jobs },
            )?;
            output::print_batch_report(&report, &output_dir);
        }
        Command::Simulate { file, widths } => {
            let html = std::fs::read_to_string(&file)?;
            output::print_simulation(&switcher::simulate(&html, &widths));
        }
        Command::Script => {
            print!("{}", switcher::SCRIPT);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn load_resolver(fields: Option<&Path>) -> Result<Arc<dyn FieldResolver>, Box<dyn std::error::Error>> {
    match fields {
        Some(path) => {
            let store = FieldStore::load(path)?;
            tracing::debug!(path = %path.display(), fields = store.len(), "loaded field store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::debug!("no field store given, every field will miss");
            Ok(Arc::new(NullResolver))
        }
    }
}

/// Block descriptor for the configured block with the given field ids.
fn field_block(config: &CoverConfig, desktop: Option<String>, mobile: Option<String>) -> BlockDescriptor {
    let mut block = BlockDescriptor::new(config.block.name.clone());
    if let Some(id) = desktop {
        block = block.with_attr(config.block.desktop_field_attribute.clone(), id);
    }
    if let Some(id) = mobile {
        block = block.with_attr(config.block.mobile_field_attribute.clone(), id);
    }
    block
}

fn read_fragment(path: &Path) -> std::io::Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
    }
}
