// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
mod commands;
mod format;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use commands::SchemaKind;
use vb_core::context::ContextSnapshot;
use vb_optimizer::BeamConfig;
use vb_prefparse::ParseRequest;

/// Exit code for runtime errors.
const EXIT_RUNTIME_ERROR: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "vb", version, about = "VectorBid pipeline CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,

    /// Output format: json | json-pretty | text | table | compact.
    #[arg(long, global = true, default_value = "text")]
    format: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest a bid-package file into the local package store.
    Ingest {
        /// Path to the file to ingest (CSV, JSONL, PDF, or TXT).
        file: PathBuf,
        /// Airline code, e.g. UAL.
        #[arg(long)]
        airline: String,
        /// Bid month, YYYY-MM.
        #[arg(long)]
        month: String,
        /// Domicile base.
        #[arg(long)]
        base: String,
        /// Fleet/equipment code.
        #[arg(long)]
        fleet: String,
        /// Seat: FO or CA.
        #[arg(long, value_enum, default_value_t = SeatArg::Fo)]
        seat: SeatArg,
        /// Package store root directory.
        #[arg(long, default_value = "./vb-data/packages")]
        packages_dir: PathBuf,
    },

    /// Rule-pack operations (validate/list/show compiled packs).
    #[command(subcommand)]
    Rulepack(RulepackCommands),

    /// Parse free-text bid instructions into a structured preference
    /// schema, via the rule-based prefilter.
    Parse {
        /// Free-text bid instructions.
        text: String,
        /// Pilot id these preferences belong to.
        #[arg(long, default_value = "P000")]
        pilot_id: String,
        /// Airline code.
        #[arg(long)]
        airline: String,
        /// Bid month, YYYY-MM; used to expand "weekends off" into dates.
        #[arg(long)]
        month: String,
        /// Domicile base.
        #[arg(long)]
        base: String,
        /// Seat: FO or CA.
        #[arg(long, value_enum, default_value_t = SeatArg::Fo)]
        seat: SeatArg,
        /// Qualified equipment. Can be repeated.
        #[arg(long = "equip")]
        equip: Vec<String>,
        /// Named persona.
        #[arg(long)]
        persona: Option<String>,
        /// Weight-normalization scheme tag.
        #[arg(long, default_value = "v1")]
        weights_version: String,
    },

    /// Run the optimizer end to end against a locally stored package and
    /// rule pack, printing ranked candidate schedules.
    Optimize(PipelineArgs),

    /// Run the optimizer, strategize, generate layers, and lint, printing
    /// a full bid-layer artifact.
    Bid(PipelineArgs),

    /// Lint an already-generated bid-layer artifact JSON file.
    Lint {
        /// Path to a JSON-encoded `BidLayerArtifact`.
        file: PathBuf,
    },

    /// Render, hash, and sign a bid-layer artifact for submission.
    Export {
        /// Path to a JSON-encoded `BidLayerArtifact`.
        file: PathBuf,
        /// HMAC signing secret.
        #[arg(long, env = "VB_EXPORT_SECRET")]
        secret: String,
        /// Export id to stamp on the record.
        #[arg(long)]
        export_id: Option<String>,
        /// Context id the export is attributed to.
        #[arg(long, default_value = "cli")]
        ctx_id: String,
        /// Pilot id the export is attributed to.
        #[arg(long, default_value = "P000")]
        pilot_id: String,
    },

    /// Print the JSON schema for a VectorBid domain type.
    Schema {
        /// Which type's schema to print.
        #[arg(value_enum)]
        kind: SchemaArg,
    },
}

#[derive(Subcommand, Debug)]
enum RulepackCommands {
    /// Validate a single rule-pack YAML file, reporting compile errors.
    Validate {
        /// Path to the rule-pack YAML file.
        file: PathBuf,
    },
    /// List `(airline, month)` rule packs found under a root directory.
    List {
        /// Rule-pack root directory.
        #[arg(long, default_value = "./vb-data/rule_packs")]
        dir: PathBuf,
    },
    /// Show a summary of one compiled rule pack.
    Show {
        /// Rule-pack root directory.
        #[arg(long, default_value = "./vb-data/rule_packs")]
        dir: PathBuf,
        /// Airline code.
        airline: String,
        /// Bid month, YYYY-MM.
        month: String,
    },
}

/// Shared inputs for `optimize` and `bid`: enough to run the Context
/// Enricher against a locally stored package and rule pack.
#[derive(clap::Args, Debug)]
struct PipelineArgs {
    /// Id of an already-ingested package (see `vb ingest`).
    package_id: String,
    /// Free-text bid instructions.
    #[arg(long)]
    text: String,
    /// Pilot id.
    #[arg(long, default_value = "P000")]
    pilot_id: String,
    /// Airline code.
    #[arg(long)]
    airline: String,
    /// Bid month, YYYY-MM.
    #[arg(long)]
    month: String,
    /// Domicile base.
    #[arg(long)]
    base: String,
    /// Seat: FO or CA.
    #[arg(long, value_enum, default_value_t = SeatArg::Fo)]
    seat: SeatArg,
    /// Qualified equipment. Can be repeated.
    #[arg(long = "equip")]
    equip: Vec<String>,
    /// Named persona.
    #[arg(long)]
    persona: Option<String>,
    /// Seniority percentile in [0, 1].
    #[arg(long, default_value_t = 0.5)]
    seniority_percentile: f64,
    /// Number of top candidates to return.
    #[arg(long, default_value_t = 10)]
    top_k: usize,
    /// Package store root directory.
    #[arg(long, default_value = "./vb-data/packages")]
    packages_dir: PathBuf,
    /// Rule-pack root directory.
    #[arg(long, default_value = "./vb-data/rule_packs")]
    rule_packs_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SeatArg {
    /// First Officer.
    Fo,
    /// Captain.
    Ca,
}

impl From<SeatArg> for vb_core::context::Seat {
    fn from(v: SeatArg) -> Self {
        match v {
            SeatArg::Fo => vb_core::context::Seat::Fo,
            SeatArg::Ca => vb_core::context::Seat::Ca,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SchemaArg {
    /// BidPackage schema.
    Package,
    /// RulePackDef schema.
    Rulepack,
    /// PreferenceSchema schema.
    Preferences,
    /// CandidateSchedule schema.
    Candidate,
    /// BidLayerArtifact schema.
    Artifact,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("vb=debug")
    } else {
        EnvFilter::new("vb=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = run(cli).await;
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(EXIT_RUNTIME_ERROR);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let fmt = commands::formatter(&cli.format)?;

    match cli.command {
        Commands::Ingest {
            file,
            airline,
            month,
            base,
            fleet,
            seat,
            packages_dir,
        } => {
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
            let package = commands::ingest_file(
                &packages_dir,
                &file,
                vb_ingest::IngestRequest {
                    airline,
                    month,
                    base,
                    fleet,
                    seat: seat.into(),
                    filename,
                },
            )
            .await?;
            println!("{}", fmt.format_package_summary(&package));
            Ok(())
        }

        Commands::Rulepack(RulepackCommands::Validate { file }) => {
            match commands::load_rule_pack_file(&file) {
                Ok(pack) => {
                    println!("{}", fmt.format_rule_pack(&pack));
                    Ok(())
                }
                Err(e) => {
                    println!("{}", fmt.format_error(&format!("{e:#}")));
                    std::process::exit(EXIT_RUNTIME_ERROR);
                }
            }
        }
        Commands::Rulepack(RulepackCommands::List { dir }) => {
            for (airline, month) in commands::list_rule_packs(&dir)? {
                println!("{airline}/{month}");
            }
            Ok(())
        }
        Commands::Rulepack(RulepackCommands::Show { dir, airline, month }) => {
            let loader = vb_rulepack::RulePackLoader::new(&dir);
            let pack = loader
                .load(&airline, &month)
                .with_context(|| format!("loading rule pack {airline}/{month}"))?;
            println!("{}", fmt.format_rule_pack(&pack));
            Ok(())
        }

        Commands::Parse {
            text,
            pilot_id,
            airline,
            month,
            base,
            seat,
            equip,
            persona,
            weights_version,
        } => {
            let schema = commands::parse_preferences(ParseRequest {
                pilot_id,
                airline,
                month,
                base,
                seat: seat.into(),
                equip,
                text,
                persona,
                weights_version,
            })
            .await;
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }

        Commands::Optimize(args) => {
            let (candidates, _preferences, _stats) = run_pipeline(args).await?;
            println!("{}", fmt.format_candidates(&candidates));
            Ok(())
        }

        Commands::Bid(args) => {
            let ctx = build_context(&args);
            let (candidates, preferences, stats) = run_pipeline(args).await?;
            let artifact = commands::build_and_lint_artifact(&ctx, &preferences, &stats, &candidates);
            println!("{}", fmt.format_artifact(&artifact));
            Ok(())
        }

        Commands::Lint { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let artifact: vb_core::layer::BidLayerArtifact = serde_json::from_str(&text)
                .with_context(|| format!("parsing {} as a BidLayerArtifact", file.display()))?;
            let report = vb_linter::lint(&artifact, vb_linter::KNOWN_FILTER_TYPES);
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }

        Commands::Export {
            file,
            secret,
            export_id,
            ctx_id,
            pilot_id,
        } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let artifact: vb_core::layer::BidLayerArtifact = serde_json::from_str(&text)
                .with_context(|| format!("parsing {} as a BidLayerArtifact", file.display()))?;
            let export_id = export_id.unwrap_or_else(|| Uuid::new_v4().to_string());
            let (rendered, record) = commands::export_artifact(
                &artifact,
                secret.as_bytes(),
                export_id,
                ctx_id,
                pilot_id,
            )?;
            println!("{rendered}");
            eprintln!(
                "export_id={} hash={} signature={}",
                record.export_id, record.artifact_hash, record.signature
            );
            Ok(())
        }

        Commands::Schema { kind } => {
            let sk = match kind {
                SchemaArg::Package => SchemaKind::Package,
                SchemaArg::Rulepack => SchemaKind::RulePack,
                SchemaArg::Preferences => SchemaKind::Preferences,
                SchemaArg::Candidate => SchemaKind::Candidate,
                SchemaArg::Artifact => SchemaKind::Artifact,
            };
            println!("{}", commands::schema_json(sk)?);
            Ok(())
        }
    }
}

fn build_context(args: &PipelineArgs) -> ContextSnapshot {
    let mut ctx = ContextSnapshot {
        ctx_id: Uuid::new_v4().to_string(),
        pilot_id: args.pilot_id.clone(),
        airline: args.airline.clone(),
        month: args.month.clone(),
        base: args.base.clone(),
        seat: args.seat.into(),
        equip: args.equip.clone(),
        seniority_percentile: args.seniority_percentile,
        commuting_profile: Default::default(),
        default_weights: Default::default(),
    };
    ctx.normalize();
    ctx
}

async fn run_pipeline(
    args: PipelineArgs,
) -> Result<(
    Vec<vb_core::CandidateSchedule>,
    vb_core::PreferenceSchema,
    std::collections::BTreeMap<String, f64>,
)> {
    let ctx = build_context(&args);
    let pref_request = ParseRequest {
        pilot_id: args.pilot_id,
        airline: args.airline,
        month: args.month,
        base: args.base,
        seat: args.seat.into(),
        equip: args.equip,
        text: args.text,
        persona: args.persona,
        weights_version: "v1".into(),
    };

    let beam_config = BeamConfig {
        top_k: args.top_k,
        ..BeamConfig::default()
    };

    commands::run_optimize(
        commands::PipelineInputs {
            packages_dir: args.packages_dir,
            rule_packs_dir: args.rule_packs_dir,
            package_id: args.package_id,
            ctx,
            pref_request,
        },
        &beam_config,
    )
    .await
}
