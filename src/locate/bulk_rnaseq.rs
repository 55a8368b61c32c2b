//! Locators for bulk RNA-seq pipeline outputs.
//!
//! Layout under the data root:
//! - `00-RawData/Fastq`, `00-RawData/FastQC_Reports`: raw reads and their QC
//! - `01-TG_Preproc/Fastq`, `01-TG_Preproc/FastQC_Reports`: trimmed reads and QC
//! - `Metadata`: the runsheet
//! - `{rel_dir}/{label}_multiqc_report`: MultiQC output directories
//!
//! `Fastq` expects the exact gzipped name; `FastqSearch` matches by pattern
//! and accepts either a gzipped or an uncompressed FASTQ, but only one.

use crate::locate::{locate_exact, locate_pattern, LocateError, Locator};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};

/// Processing stage of a read file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadStage {
    Raw,
    Trimmed,
}

impl ReadStage {
    fn dir(self) -> &'static str {
        match self {
            ReadStage::Raw => "00-RawData",
            ReadStage::Trimmed => "01-TG_Preproc",
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            ReadStage::Raw => "raw",
            ReadStage::Trimmed => "trimmed",
        }
    }
}

/// Mate of a paired-end read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadDirection {
    Forward,
    Reverse,
}

impl ReadDirection {
    fn mate(self) -> &'static str {
        match self {
            ReadDirection::Forward => "R1",
            ReadDirection::Reverse => "R2",
        }
    }
}

impl fmt::Display for ReadDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mate())
    }
}

/// MultiQC report directory.
#[derive(Debug, Clone)]
pub struct MultiQcDir {
    search_root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct MultiQcQuery {
    pub rel_dir: PathBuf,
    pub mqc_label: String,
}

impl MultiQcDir {
    pub fn new(search_root: impl Into<PathBuf>) -> Self {
        MultiQcDir {
            search_root: search_root.into(),
        }
    }
}

impl Locator for MultiQcDir {
    type Query = MultiQcQuery;

    fn find(&self, query: &MultiQcQuery) -> Result<PathBuf, LocateError> {
        let relative = query
            .rel_dir
            .join(format!("{}_multiqc_report", query.mqc_label));
        locate_exact(&self.search_root, &relative)
    }
}

/// FastQC report for one mate of one sample.
#[derive(Debug, Clone)]
pub struct FastqcReport {
    search_root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FastqcQuery {
    pub sample_name: String,
    pub stage: ReadStage,
    pub direction: ReadDirection,
    /// `html` or `zip`
    pub ext: String,
}

impl FastqcReport {
    pub fn new(search_root: impl Into<PathBuf>) -> Self {
        FastqcReport {
            search_root: search_root.into(),
        }
    }
}

impl Locator for FastqcReport {
    type Query = FastqcQuery;

    fn find(&self, query: &FastqcQuery) -> Result<PathBuf, LocateError> {
        let relative = Path::new(query.stage.dir())
            .join("FastQC_Reports")
            .join(format!(
                "{}_{}_{}_fastqc.{}",
                query.sample_name,
                query.direction.mate(),
                query.stage.suffix(),
                query.ext
            ));
        locate_exact(&self.search_root, &relative)
    }
}

/// Runsheet generated for a dataset.
#[derive(Debug, Clone)]
pub struct Runsheet {
    search_root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RunsheetQuery {
    pub datasystem_name: String,
}

impl Runsheet {
    pub fn new(search_root: impl Into<PathBuf>) -> Self {
        Runsheet {
            search_root: search_root.into(),
        }
    }
}

impl Locator for Runsheet {
    type Query = RunsheetQuery;

    fn find(&self, query: &RunsheetQuery) -> Result<PathBuf, LocateError> {
        let relative = Path::new("Metadata").join(format!(
            "AST_autogen_template_RNASeq_RCP_{}_RNASeq_runsheet.csv",
            query.datasystem_name
        ));
        locate_exact(&self.search_root, &relative)
    }
}

/// Gzipped FASTQ for one mate of one sample.
#[derive(Debug, Clone)]
pub struct Fastq {
    search_root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FastqQuery {
    pub sample_name: String,
    pub stage: ReadStage,
    pub direction: ReadDirection,
}

impl Fastq {
    pub fn new(search_root: impl Into<PathBuf>) -> Self {
        Fastq {
            search_root: search_root.into(),
        }
    }
}

impl Locator for Fastq {
    type Query = FastqQuery;

    fn find(&self, query: &FastqQuery) -> Result<PathBuf, LocateError> {
        let relative = Path::new(query.stage.dir()).join("Fastq").join(format!(
            "{}_{}_{}.fastq.gz",
            query.sample_name,
            query.direction.mate(),
            query.stage.suffix()
        ));
        locate_exact(&self.search_root, &relative)
    }
}

/// FASTQ for one mate of one sample, compressed or not.
#[derive(Debug, Clone)]
pub struct FastqSearch {
    search_root: PathBuf,
}

impl FastqSearch {
    pub fn new(search_root: impl Into<PathBuf>) -> Self {
        FastqSearch {
            search_root: search_root.into(),
        }
    }
}

impl Locator for FastqSearch {
    type Query = FastqQuery;

    fn find(&self, query: &FastqQuery) -> Result<PathBuf, LocateError> {
        let source = format!(
            r"^{}_{}_{}\.fastq(\.gz)?$",
            regex::escape(&query.sample_name),
            query.direction.mate(),
            query.stage.suffix()
        );
        let pattern = Regex::new(&source).map_err(|_| LocateError::NotFound {
            expected: self.search_root.join(query.stage.dir()).join("Fastq"),
            pattern: source.clone(),
        })?;
        locate_pattern(
            &self.search_root,
            &Path::new(query.stage.dir()).join("Fastq"),
            &pattern,
        )
    }
}
