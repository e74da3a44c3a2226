use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;

use mdocx_lib::exit_codes::exit;
use mdocx_lib::{CitationKeyFormat, ExportOptions, ImportOptions, MixedCitationStyle};

/// Convert Manuscript Markdown to DOCX and back.
///
/// The direction follows the input extension: `.md` exports to DOCX,
/// `.docx` imports to Markdown (plus a companion `.bib` when the document
/// carries citations).
#[derive(Debug, Parser)]
#[command(name = "mdocx", version, about)]
struct Cli {
    /// Input file (.md or .docx)
    input: PathBuf,

    /// Output file (defaults to the input with the opposite extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite the output file if it already exists
    #[arg(short, long)]
    force: bool,

    /// Citation key scheme used on import
    #[arg(long, value_enum, default_value_t = CitationKeyFormat::AuthorYearTitle)]
    citation_key_format: CitationKeyFormat,

    /// BibTeX bibliography used to resolve citation keys on export
    #[arg(long)]
    bib: Option<PathBuf>,

    /// Template .docx whose styles, theme, and settings seed the output
    #[arg(long)]
    template: Option<PathBuf>,

    /// Author name stamped on tracked changes and comments
    #[arg(long)]
    author: Option<String>,

    /// How citation groups mixing Zotero-linked and plain entries are emitted
    #[arg(long, value_enum, default_value_t = MixedCitationStyle::Separate)]
    mixed_citation_style: MixedCitationStyle,

    /// Directory holding cached CSL styles
    #[arg(long)]
    csl_cache_dir: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let extension = cli
        .input
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let result = match extension.as_str() {
        "md" | "markdown" => export(&cli),
        "docx" => import(&cli),
        other => {
            eprintln!("error: unsupported input extension `{other}` (expected .md or .docx)");
            exit::tool_error();
        }
    };

    match result {
        Ok(warnings) => {
            for warning in warnings {
                eprintln!("warning: {warning}");
            }
            exit::success();
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            exit::conversion_failed();
        }
    }
}

fn export(cli: &Cli) -> anyhow::Result<Vec<String>> {
    let markdown = fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;

    let bib_text = match &cli.bib {
        Some(path) => Some(fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?),
        None => load_frontmatter_bibliography(&cli.input, &markdown)?,
    };

    let template_docx = match &cli.template {
        Some(path) => Some(fs::read(path).with_context(|| format!("reading {}", path.display()))?),
        None => None,
    };

    let opts = ExportOptions {
        author_name: cli.author.clone(),
        template_docx,
        mixed_citation_style: cli.mixed_citation_style,
        csl_cache_dir: cli.csl_cache_dir.as_ref().map(|p| p.display().to_string()),
        source_dir: cli.input.parent().map(|p| p.display().to_string()),
        ..Default::default()
    };

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("docx"));
    check_overwrite(&output, cli.force)?;

    let export = mdocx_lib::convert_md_to_docx(&markdown, bib_text.as_deref(), &opts)?;
    fs::write(&output, &export.docx).with_context(|| format!("writing {}", output.display()))?;
    println!("Wrote {}", output.display());
    Ok(export.warnings)
}

fn import(cli: &Cli) -> anyhow::Result<Vec<String>> {
    let bytes = fs::read(&cli.input).with_context(|| format!("reading {}", cli.input.display()))?;

    let opts = ImportOptions {
        citation_key_format: cli.citation_key_format,
    };

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("md"));
    check_overwrite(&output, cli.force)?;

    let import = mdocx_lib::convert_docx(&bytes, &opts)?;
    fs::write(&output, &import.markdown).with_context(|| format!("writing {}", output.display()))?;
    println!("Wrote {}", output.display());

    if let Some(bibtex) = &import.bibtex {
        let bib_path = output.with_extension("bib");
        check_overwrite(&bib_path, cli.force)?;
        fs::write(&bib_path, bibtex).with_context(|| format!("writing {}", bib_path.display()))?;
        println!("Wrote {}", bib_path.display());
    }

    Ok(import.warnings)
}

/// Load the bibliography the frontmatter points at, resolved relative to the
/// document.
fn load_frontmatter_bibliography(input: &Path, markdown: &str) -> anyhow::Result<Option<String>> {
    let (fm, _, _) = mdocx_lib::frontmatter::parse(markdown);
    let Some(first) = fm.bibliography.first() else {
        return Ok(None);
    };
    let dir = input.parent().unwrap_or_else(|| Path::new("."));
    let path = dir.join(first);
    let text = fs::read_to_string(&path).with_context(|| format!("reading bibliography {}", path.display()))?;
    Ok(Some(text))
}

fn check_overwrite(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    Ok(())
}
