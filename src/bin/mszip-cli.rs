//! mszip-cli - Command-line interface for the MSZIP decoder
//!
//! Decodes raw DEFLATE streams and cabinet folders given as a run of data
//! block records.

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use mszip::{
    inflate_bytes, ChecksumPolicy, CompressionType, DataBlock, DecodedFolderStream, Folder,
    FolderDecompressor,
};
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "mszip-cli")]
#[command(about = "A CLI tool for MSZIP and raw DEFLATE decompression")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompress a raw DEFLATE stream
    Inflate {
        /// Input compressed file
        input: PathBuf,

        /// Output decompressed file
        output: PathBuf,

        /// Force overwrite of output file
        #[arg(short, long)]
        force: bool,
    },

    /// Decompress a folder stored as consecutive data block records
    Folder {
        /// File holding the data block records
        input: PathBuf,

        /// Output decompressed file
        output: PathBuf,

        /// Number of data blocks in the folder
        #[arg(short, long)]
        blocks: usize,

        /// Per-block reserved area size in bytes
        #[arg(short, long, default_value_t = 0)]
        reserve: u8,

        /// Folder compression method
        #[arg(short, long, value_enum, default_value_t = CliCompression::Mszip)]
        compression: CliCompression,

        /// How to handle data block checksums
        #[arg(long, value_enum, default_value_t = CliChecksumPolicy::Warn)]
        checksums: CliChecksumPolicy,

        /// Force overwrite of output file
        #[arg(short, long)]
        force: bool,
    },

    /// List the data blocks of a folder file
    Info {
        /// File holding the data block records
        input: PathBuf,

        /// Number of data blocks in the folder
        #[arg(short, long)]
        blocks: usize,

        /// Per-block reserved area size in bytes
        #[arg(short, long, default_value_t = 0)]
        reserve: u8,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CliCompression {
    /// Stored blocks
    None,
    /// MSZIP (DEFLATE with "CK" block markers) - Default
    Mszip,
    /// Quantum (not supported)
    Quantum,
    /// LZX (not supported)
    Lzx,
}

impl From<CliCompression> for CompressionType {
    fn from(compression: CliCompression) -> Self {
        match compression {
            CliCompression::None => CompressionType::None,
            CliCompression::Mszip => CompressionType::MsZip,
            CliCompression::Quantum => CompressionType::Quantum,
            CliCompression::Lzx => CompressionType::Lzx,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CliChecksumPolicy {
    /// Never compute checksums
    Skip,
    /// Log mismatches and keep going - Default
    Warn,
    /// Fail on the first mismatch
    Enforce,
}

impl From<CliChecksumPolicy> for ChecksumPolicy {
    fn from(policy: CliChecksumPolicy) -> Self {
        match policy {
            CliChecksumPolicy::Skip => ChecksumPolicy::Skip,
            CliChecksumPolicy::Warn => ChecksumPolicy::Warn,
            CliChecksumPolicy::Enforce => ChecksumPolicy::Enforce,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        LevelFilter::Error
    } else if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let result = match cli.command {
        Commands::Inflate {
            input,
            output,
            force,
        } => inflate_file(&input, &output, force, cli.verbose, cli.quiet),
        Commands::Folder {
            input,
            output,
            blocks,
            reserve,
            compression,
            checksums,
            force,
        } => decompress_folder_file(
            &input,
            &output,
            blocks,
            reserve,
            compression.into(),
            checksums.into(),
            force,
            cli.quiet,
        ),
        Commands::Info {
            input,
            blocks,
            reserve,
        } => show_folder_info(&input, blocks, reserve, cli.verbose),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn check_paths(input: &Path, output: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !input.exists() {
        return Err(format!("Input file '{}' does not exist", input.display()).into());
    }

    if output.exists() && !force {
        return Err(format!(
            "Output file '{}' already exists. Use --force to overwrite",
            output.display()
        )
        .into());
    }

    Ok(())
}

fn inflate_file(
    input: &Path,
    output: &Path,
    force: bool,
    verbose: bool,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    check_paths(input, output, force)?;

    if verbose {
        println!("Inflating '{}' to '{}'", input.display(), output.display());
    }

    let start_time = Instant::now();
    let compressed_data = fs::read(input)?;
    let input_size = compressed_data.len();

    let decompressed_data =
        inflate_bytes(&compressed_data).map_err(|e| format!("Decompression failed: {}", e))?;
    fs::write(output, &decompressed_data)?;

    if !quiet {
        println!("✓ Decompression successful!");
        println!("  Input:  {} bytes", input_size);
        println!("  Output: {} bytes", decompressed_data.len());
        println!("  Time:   {:.2?}", start_time.elapsed());
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn decompress_folder_file(
    input: &Path,
    output: &Path,
    block_count: usize,
    reserve: u8,
    compression: CompressionType,
    policy: ChecksumPolicy,
    force: bool,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    check_paths(input, output, force)?;

    let start_time = Instant::now();
    let records = fs::read(input)?;
    let blocks = DataBlock::parse_sequence(&records, block_count, reserve)?;

    // Show progress bar for larger folders
    let progress = if !quiet && block_count > 32 {
        let pb = ProgressBar::new(2);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
                )?
                .progress_chars("#>-"),
        );
        pb.set_message("Decompressing...");
        pb.inc(1);
        Some(pb)
    } else {
        None
    };

    let folder = Folder::new(compression, blocks);
    let decoded = FolderDecompressor::new()
        .with_checksum_policy(policy)
        .decompress(&folder)
        .map_err(|e| format!("Decompression failed: {}", e))?;

    if let Some(ref pb) = progress {
        pb.inc(1);
        pb.finish_with_message("Decompression complete");
    }

    fs::write(output, decoded.as_bytes())?;

    if !quiet {
        print_folder_summary(records.len(), &decoded);
        println!("  Time:   {:.2?}", start_time.elapsed());
    }

    Ok(())
}

fn print_folder_summary(input_size: usize, decoded: &DecodedFolderStream) {
    let stats = decoded.stats();
    println!("✓ Decompression successful!");
    println!("  Input:  {} bytes", input_size);
    println!("  Output: {} bytes", decoded.len());
    println!(
        "  Blocks: {} data, {} DEFLATE ({} stored, {} fixed, {} dynamic)",
        decoded.block_offsets().len(),
        stats.blocks(),
        stats.stored_blocks,
        stats.fixed_blocks,
        stats.dynamic_blocks
    );
    if stats.checksum_mismatches > 0 {
        println!("  Checksum mismatches: {}", stats.checksum_mismatches);
    }
}

fn show_folder_info(
    input: &Path,
    block_count: usize,
    reserve: u8,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !input.exists() {
        return Err(format!("Input file '{}' does not exist", input.display()).into());
    }

    let records = fs::read(input)?;
    let blocks = DataBlock::parse_sequence(&records, block_count, reserve)?;

    println!("Folder Information:");
    println!("  File: {}", input.display());
    println!("  Size: {} bytes", records.len());
    println!("  Data blocks: {}", blocks.len());

    for (index, block) in blocks.iter().enumerate() {
        let checksum_status = if !block.has_checksum() {
            "none"
        } else if block.compute_checksum() == block.checksum {
            "ok"
        } else {
            "MISMATCH"
        };
        println!(
            "  [{}] offset {:>8}: {:>5} -> {:>5} bytes, checksum {:08x} ({})",
            index,
            block.offset,
            block.compressed_size,
            block.uncompressed_size,
            block.checksum,
            checksum_status
        );
        if verbose && block.payload.len() >= 2 {
            println!(
                "      Payload starts: {:02x} {:02x}",
                block.payload[0], block.payload[1]
            );
        }
    }

    let total: usize = blocks.iter().map(|b| b.uncompressed_size as usize).sum();
    println!("  Uncompressed total: {} bytes", total);

    Ok(())
}
