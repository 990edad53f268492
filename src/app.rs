use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Args, Parser};
use log::{info, warn};

use crate::annotate::{self, FamilyMap, LeafPanel};
use crate::export::pdf::PdfFile;
use crate::export::svg::SvgFile;
use crate::gui;
use crate::io::{self, fasta, matrix};
use crate::render::{build_scene, Renderer, Scene, Style};
use crate::tree::prune::prune_to;
use crate::tree::root::root_tree;
use crate::tree::support::{collapse_unsupported, SupportScheme, SupportThresholds};
use crate::tree::Tree;

/// Flags shared by both binaries.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Newick tree file.
    #[arg(short = 't', long = "tree", value_name = "TREE_FILE")]
    pub tree: PathBuf,

    /// Support label dialect: "bootstrap" or "iqtree".
    #[arg(short = 's', long = "support")]
    pub support: String,

    /// Tab-separated leaf-to-family mapping, drawn next to each tip.
    #[arg(short = 'f', long = "family", value_name = "FAMILY_FILE")]
    pub family: Option<PathBuf>,

    /// Keep only the leaves listed in this file (first tab column).
    #[arg(short = 'p', long = "prune", value_name = "PRUNE_FILE")]
    pub prune: Option<PathBuf>,

    /// Collapse bootstrap branches below this support.
    #[arg(long, default_value_t = 70.0)]
    pub bootstrap_threshold: f64,

    /// Collapse dual-label branches whose SH-aLRT value is below this.
    #[arg(long, default_value_t = 80.0)]
    pub alrt_threshold: f64,

    /// Collapse dual-label branches whose ultrafast bootstrap is below this.
    #[arg(long, default_value_t = 95.0)]
    pub ufboot_threshold: f64,

    /// Write the figure to this file (.svg or .pdf).
    #[arg(short = 'o', long = "output", value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Skip the interactive viewer.
    #[arg(long)]
    pub headless: bool,
}

impl CommonArgs {
    pub fn thresholds(&self) -> SupportThresholds {
        SupportThresholds {
            bootstrap: self.bootstrap_threshold,
            sh_alrt: self.alrt_threshold,
            ufboot: self.ufboot_threshold,
        }
    }

    fn validate(&self) -> Result<()> {
        require_file(&self.tree, "tree")?;
        if let Some(path) = &self.family {
            require_file(path, "family")?;
        }
        if let Some(path) = &self.prune {
            require_file(path, "prune")?;
        }
        SupportScheme::from_flag(&self.support)?;
        Ok(())
    }

    fn load_families(&self) -> Result<FamilyMap> {
        match &self.family {
            Some(path) => Ok(FamilyMap::new(io::load_family_map(path)?)),
            None => Ok(FamilyMap::default()),
        }
    }

    fn apply_prune(&self, tree: &mut Tree) -> Result<()> {
        if let Some(path) = &self.prune {
            let keep = io::load_prune_list(path)?;
            prune_to(tree, &keep)?;
            info!("pruned tree down to {} tips", tree.leaf_count());
        }
        Ok(())
    }
}

/// Tree plus multiple-sequence-alignment figure.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "aln2tree",
    about = "Draw a phylogenetic tree with its multiple sequence alignment."
)]
pub struct AlignConfig {
    #[command(flatten)]
    pub common: CommonArgs,

    /// FASTA alignment with one record per tree tip.
    #[arg(short = 'a', long = "alignment", value_name = "FASTA_FILE")]
    pub alignment: PathBuf,
}

/// Tree plus numeric-matrix heatmap figure.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mat2tree",
    about = "Draw a phylogenetic tree with a per-tip numeric heatmap."
)]
pub struct MatrixConfig {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Tab-separated numeric matrix with a header row; rows keyed by tip id.
    #[arg(short = 'm', long = "matrix", value_name = "MATRIX_FILE")]
    pub matrix: PathBuf,

    /// Root on the common ancestor of these tips instead of the midpoint.
    #[arg(short = 'r', long = "root", value_delimiter = ',', value_name = "TIPS")]
    pub root: Vec<String>,

    /// Value mapped to the neutral center color.
    #[arg(long, default_value_t = 0.0)]
    pub center: f64,

    /// Heatmap contrast; raise towards 2.0 for wide-range count matrices.
    #[arg(long, default_value_t = 1.1)]
    pub heatmap_contrast: f64,
}

pub fn run_alignment(config: &AlignConfig) -> Result<()> {
    config.common.validate()?;
    require_file(&config.alignment, "alignment")?;
    let scheme = SupportScheme::from_flag(&config.common.support)?;

    let mut tree = io::load_tree(&config.common.tree)?;
    info!("loaded tree with {} tips", tree.leaf_count());

    root_tree(&mut tree, None)?;
    let collapsed = collapse_unsupported(&mut tree, scheme, &config.common.thresholds());
    info!("collapsed {collapsed} weakly supported branches");

    config.common.apply_prune(&mut tree)?;

    let alignment = fasta::load_alignment(&config.alignment)?;
    let panel = LeafPanel::Alignment(annotate::bind_alignment(&tree, &alignment)?);
    let families = config.common.load_families()?;

    let scene = finish_scene(&mut tree, &panel, &families)?;

    if let Some(output) = &config.common.output {
        export_scene(&scene, output, &figure_title(&config.common.tree))?;
        info!("wrote {}", output.display());
    }

    maybe_show(scene, &config.common)
}

pub fn run_matrix(config: &MatrixConfig) -> Result<()> {
    config.common.validate()?;
    require_file(&config.matrix, "matrix")?;
    let scheme = SupportScheme::from_flag(&config.common.support)?;

    let mut tree = io::load_tree(&config.common.tree)?;
    info!("loaded tree with {} tips", tree.leaf_count());

    let root_tips = (!config.root.is_empty()).then_some(config.root.as_slice());
    root_tree(&mut tree, root_tips)?;
    let collapsed = collapse_unsupported(&mut tree, scheme, &config.common.thresholds());
    info!("collapsed {collapsed} weakly supported branches");

    config.common.apply_prune(&mut tree)?;

    let table = matrix::load_matrix(&config.matrix)?;
    let panel = LeafPanel::Heatmap(annotate::bind_matrix(
        &tree,
        &table,
        config.center,
        config.heatmap_contrast,
    )?);
    let families = config.common.load_families()?;

    let scene = finish_scene(&mut tree, &panel, &families)?;

    let output = config
        .common
        .output
        .clone()
        .unwrap_or_else(|| default_pdf_path(&config.common.tree));
    export_scene(&scene, &output, &figure_title(&config.common.tree))?;
    info!("wrote {}", output.display());

    maybe_show(scene, &config.common)
}

fn finish_scene(tree: &mut Tree, panel: &LeafPanel, families: &FamilyMap) -> Result<Scene> {
    tree.ladderize(false);
    let Some(layout) = tree.layout() else {
        bail!("tree has no root to lay out");
    };
    Ok(build_scene(
        tree,
        &layout,
        Some(panel),
        families,
        &Style::default(),
    ))
}

fn maybe_show(scene: Scene, common: &CommonArgs) -> Result<()> {
    if common.headless {
        return Ok(());
    }
    if !display_available() {
        warn!("no display detected; skipping the interactive viewer");
        return Ok(());
    }
    gui::show_window(scene, &figure_title(&common.tree))
}

fn figure_title(tree_path: &Path) -> String {
    tree_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tree".to_string())
}

/// Default heatmap output sits next to the tree file, with ".pdf" appended to
/// the full file name.
fn default_pdf_path(tree_path: &Path) -> PathBuf {
    let mut name = tree_path.as_os_str().to_os_string();
    name.push(".pdf");
    PathBuf::from(name)
}

fn export_scene(scene: &Scene, path: &Path, title: &str) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("svg") => SvgFile::new(path).render(scene),
        Some("pdf") => PdfFile::new(path, title).render(scene),
        _ => bail!(
            "unsupported output format: {} (expected .svg or .pdf)",
            path.display()
        ),
    }
}

fn require_file(path: &Path, kind: &str) -> Result<()> {
    if !path.is_file() {
        bail!("{kind} file not found: {}", path.display());
    }
    Ok(())
}

fn display_available() -> bool {
    #[cfg(any(
        target_os = "linux",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "netbsd"
    ))]
    {
        std::env::var("DISPLAY").is_ok() || std::env::var("WAYLAND_DISPLAY").is_ok()
    }
    #[cfg(not(any(
        target_os = "linux",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "netbsd"
    )))]
    {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_cli_parses_short_flags() {
        let config = AlignConfig::try_parse_from([
            "aln2tree",
            "-t",
            "tree.nwk",
            "-a",
            "aln.fasta",
            "-s",
            "iqtree",
            "--headless",
        ])
        .unwrap();

        assert_eq!(config.common.tree, PathBuf::from("tree.nwk"));
        assert_eq!(config.alignment, PathBuf::from("aln.fasta"));
        assert_eq!(config.common.support, "iqtree");
        assert!(config.common.headless);
        assert!((config.common.thresholds().ufboot - 95.0).abs() < 1e-12);
    }

    #[test]
    fn matrix_cli_splits_root_tips_on_commas() {
        let config = MatrixConfig::try_parse_from([
            "mat2tree",
            "-t",
            "tree.nwk",
            "-m",
            "matrix.tsv",
            "-s",
            "iqtree",
            "-r",
            "tipA,tipB",
            "--heatmap-contrast",
            "1.8",
        ])
        .unwrap();

        assert_eq!(config.root, vec!["tipA".to_string(), "tipB".to_string()]);
        assert!((config.heatmap_contrast - 1.8).abs() < 1e-12);
        assert!((config.center - 0.0).abs() < 1e-12);
    }

    #[test]
    fn missing_tree_flag_is_rejected() {
        assert!(AlignConfig::try_parse_from(["aln2tree", "-a", "aln.fasta", "-s", "bootstrap"])
            .is_err());
    }

    #[test]
    fn default_output_appends_pdf_to_the_tree_name() {
        let path = default_pdf_path(Path::new("data/tyr.treefile"));
        assert_eq!(path, PathBuf::from("data/tyr.treefile.pdf"));
    }

    #[test]
    fn unknown_output_extension_is_rejected() {
        let scene = Scene {
            width: 10.0,
            height: 10.0,
            shapes: Vec::new(),
        };
        let err = export_scene(&scene, Path::new("out.png"), "t")
            .unwrap_err()
            .to_string();
        assert!(err.contains("out.png"));
    }

    #[test]
    fn missing_input_files_fail_validation() {
        let config = AlignConfig::try_parse_from([
            "aln2tree",
            "-t",
            "/nonexistent/tree.nwk",
            "-a",
            "/nonexistent/aln.fasta",
            "-s",
            "bootstrap",
        ])
        .unwrap();
        let err = config.common.validate().unwrap_err().to_string();
        assert!(err.contains("tree file not found"));
    }
}
