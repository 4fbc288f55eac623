use clap::{Parser, Subcommand, ValueEnum};
use genai::adapter::AdapterKind;
use std::path::PathBuf;

/// Sort handwritten note scans into subject folders
#[derive(Parser, Debug)]
#[command(
    name = "notefiler",
    about = "Classify handwritten-note scans by subject and file them into cloud folders",
    version,
    author,
    long_about = "notefiler extracts text from scanned handwritten notes with OCR, classifies \
                  each note into an academic subject and uploads it into \
                  OrganizedNotes/<subject> on Google Drive or a local directory. Notes the \
                  classifier is unsure about go to OrganizedNotes/uncategorized."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines on stderr")]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Classify notes and upload them into subject folders",
        long_about = "Runs OCR on every image given (directories are scanned for jpg, jpeg, \
                      png, bmp, tiff and tif files), classifies the text and uploads each \
                      note into its subject folder.\n\n\
                      Examples:\n  \
                      notefiler organize scans/\n  \
                      notefiler organize page1.png page2.jpg --threshold 0.5\n  \
                      notefiler organize scans/ --store drive --root 1AbCdEf\n  \
                      notefiler organize scans/ --classifier llm --backend ollama --model qwen2.5:7b"
    )]
    Organize(OrganizeArgs),

    #[command(about = "List the subject labels notes can be filed under")]
    Subjects(SubjectsArgs),

    #[command(
        about = "Show the effective configuration",
        long_about = "Prints the configuration resolved from NOTEFILER_* environment \
                      variables and defaults, then validates it."
    )]
    Config(ConfigArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct OrganizeArgs {
    #[arg(
        value_name = "INPUT",
        required = true,
        help = "Image files or directories containing note scans"
    )]
    pub inputs: Vec<PathBuf>,

    #[arg(
        short = 't',
        long,
        value_name = "CONFIDENCE",
        help = "Minimum confidence to file under a subject, in [0.1, 0.9] (default 0.3)"
    )]
    pub threshold: Option<f32>,

    #[arg(
        long,
        value_name = "FOLDER_ID",
        help = "Folder the OrganizedNotes base folder is created under (default: store root)"
    )]
    pub root: Option<String>,

    #[arg(
        short = 'w',
        long,
        value_name = "N",
        help = "Number of notes processed concurrently"
    )]
    pub workers: Option<usize>,

    #[arg(long, value_enum, help = "Destination store")]
    pub store: Option<StoreArg>,

    #[arg(
        long,
        value_name = "DIR",
        help = "Directory backing the local store"
    )]
    pub store_dir: Option<PathBuf>,

    #[arg(long, value_enum, help = "Subject model used to score note text")]
    pub classifier: Option<ClassifierArg>,

    #[arg(
        long,
        value_name = "FILE",
        help = "YAML list of extra subjects (label, description) added after the built-in ones"
    )]
    pub subjects: Option<PathBuf>,

    #[arg(
        short = 'b',
        long,
        value_parser = parse_adapter_kind,
        help = "LLM provider for the llm classifier"
    )]
    pub backend: Option<AdapterKind>,

    #[arg(
        short = 'm',
        long,
        value_name = "MODEL",
        help = "Model name to use (provider-specific, e.g., 'qwen2.5:7b' for Ollama)"
    )]
    pub model: Option<String>,

    #[arg(long, value_name = "PATH", help = "Path to the tesseract binary")]
    pub tesseract: Option<PathBuf>,

    #[arg(short = 'r', long, help = "Descend into subdirectories of input directories")]
    pub recursive: bool,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the report to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct SubjectsArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "YAML list of extra subjects to include"
    )]
    pub subjects: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreArg {
    Local,
    Drive,
}

impl From<StoreArg> for crate::config::StoreKind {
    fn from(arg: StoreArg) -> Self {
        match arg {
            StoreArg::Local => crate::config::StoreKind::Local,
            StoreArg::Drive => crate::config::StoreKind::Drive,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierArg {
    Keyword,
    Llm,
}

impl From<ClassifierArg> for crate::config::ClassifierKind {
    fn from(arg: ClassifierArg) -> Self {
        match arg {
            ClassifierArg::Keyword => crate::config::ClassifierKind::Keyword,
            ClassifierArg::Llm => crate::config::ClassifierKind::Llm,
        }
    }
}

fn parse_adapter_kind(s: &str) -> Result<AdapterKind, String> {
    crate::config::parse_provider(s).map_err(|e| e.to_string())
}
