//! Administrative CLI over the on-disk revision store: inspect indexes,
//! verify consistency, and fold a shard's unpacked revisions into a pack
//! file. Not part of the library's public API surface; a thin wrapper
//! around it for operators.

use std::fs;

use structopt::StructOpt;

use fsfs_core::{err_at, pack, revfile, verify, Layout, Repository, Result, Revision, Shard, FORMAT_MAX_SUPPORTED};

#[derive(Clone, StructOpt)]
pub struct Opt {
    #[structopt(subcommand)]
    subcmd: SubCommand,
}

#[derive(Clone, StructOpt)]
pub enum SubCommand {
    /// Write every L2P/P2L entry of a revision file or pack file as a
    /// human-editable text dump (see `load-index`).
    DumpIndex {
        #[structopt(long = "root", parse(from_os_str))]
        root: std::path::PathBuf,
        #[structopt(long = "max-files-per-dir", default_value = "1000")]
        max_files_per_dir: u64,
        #[structopt(long = "revision", conflicts_with = "shard")]
        revision: Option<Revision>,
        #[structopt(long = "shard")]
        shard: Option<Shard>,
        #[structopt(long = "page-size", default_value = "4096")]
        page_size: u64,
    },
    /// Rebuild a revision file's L2P/P2L indexes and footer from a
    /// `dump-index` text dump. The target file must already be truncated to
    /// its item data (everything before the old L2P offset) before this
    /// runs; the rebuilt indexes and a fresh footer are appended in place.
    LoadIndex {
        #[structopt(long = "root", parse(from_os_str))]
        root: std::path::PathBuf,
        #[structopt(long = "max-files-per-dir", default_value = "1000")]
        max_files_per_dir: u64,
        #[structopt(long = "revision", conflicts_with = "shard")]
        revision: Option<Revision>,
        #[structopt(long = "shard")]
        shard: Option<Shard>,
        #[structopt(long = "dump", parse(from_os_str))]
        dump: std::path::PathBuf,
    },
    /// Cross-reference a revision file or pack file's L2P and P2L indexes
    /// and, unless `--skip-checksums` is given, re-verify every item's
    /// FNV-1a checksum.
    Verify {
        #[structopt(long = "root", parse(from_os_str))]
        root: std::path::PathBuf,
        #[structopt(long = "max-files-per-dir", default_value = "1000")]
        max_files_per_dir: u64,
        #[structopt(long = "revision", conflicts_with = "shard")]
        revision: Option<Revision>,
        #[structopt(long = "shard")]
        shard: Option<Shard>,
        #[structopt(long = "skip-checksums")]
        skip_checksums: bool,
    },
    /// Fold a shard's unpacked revisions into one pack file and advance
    /// `min-unpacked-rev` past it.
    Pack {
        #[structopt(long = "root", parse(from_os_str))]
        root: std::path::PathBuf,
        #[structopt(long = "max-files-per-dir", default_value = "1000")]
        max_files_per_dir: u64,
        #[structopt(long = "shard")]
        shard: Shard,
        #[structopt(long = "block-size", default_value = "65536")]
        block_size: u64,
        #[structopt(long = "page-size", default_value = "4096")]
        page_size: u64,
        #[structopt(long = "entries-per-page", default_value = "256")]
        entries_per_page: u64,
    },
}

fn main() {
    env_logger::init();
    let opt = Opt::from_args();
    if let Err(err) = run(opt) {
        eprintln!("fsfsadmin: {}", err);
        std::process::exit(1);
    }
}

fn run(opt: Opt) -> Result<()> {
    match opt.subcmd {
        SubCommand::DumpIndex {
            root,
            max_files_per_dir,
            revision,
            shard,
            page_size,
        } => dump_index(Layout::new(root, max_files_per_dir), revision, shard, page_size),
        SubCommand::LoadIndex {
            root,
            max_files_per_dir,
            revision,
            shard,
            dump,
        } => load_index(Layout::new(root, max_files_per_dir), revision, shard, dump),
        SubCommand::Verify {
            root,
            max_files_per_dir,
            revision,
            shard,
            skip_checksums,
        } => verify_file(Layout::new(root, max_files_per_dir), revision, shard, skip_checksums),
        SubCommand::Pack {
            root,
            max_files_per_dir,
            shard,
            block_size,
            page_size,
            entries_per_page,
        } => pack_shard(root, max_files_per_dir, shard, block_size, page_size, entries_per_page),
    }
}

/// Resolves `--revision`/`--shard` to the file they name and opens it.
fn target_path(layout: &Layout, revision: Option<Revision>, shard: Option<Shard>) -> Result<std::path::PathBuf> {
    match (revision, shard) {
        (Some(rev), None) => Ok(layout.unpacked_rev(rev)),
        (None, Some(shard)) => Ok(layout.pack_file(shard)),
        _ => err_at!(InvalidInput, msg: "exactly one of --revision or --shard is required"),
    }
}

fn open_reader(path: &std::path::Path) -> Result<(fs::File, revfile::Reader)> {
    let mut file = fs::File::open(path)?;
    let file_len = file.metadata()?.len();
    let reader = revfile::Reader::open(&mut file, file_len, FORMAT_MAX_SUPPORTED)?;
    Ok((file, reader))
}

fn dump_index(layout: Layout, revision: Option<Revision>, shard: Option<Shard>, page_size: u64) -> Result<()> {
    let path = target_path(&layout, revision, shard)?;
    let (_file, reader) = open_reader(&path)?;
    let (l2p, p2l) = match reader {
        revfile::Reader::Logical { l2p, p2l } => (l2p, p2l),
        revfile::Reader::Physical(trailer) => {
            println!("physical addressing: changed-paths @ {}, root node-rev @ {}", trailer.changed_paths_offset, trailer.root_noderev_offset);
            return Ok(());
        }
    };

    print!("{}", verify::dump_index(&l2p, &p2l, page_size));
    Ok(())
}

/// Reads a `dump-index` text dump and reconstructs L2P + P2L + footer onto
/// the tail of `target_path`'s file. The file must already have been
/// truncated to its item data by the operator before this runs.
fn load_index(layout: Layout, revision: Option<Revision>, shard: Option<Shard>, dump: std::path::PathBuf) -> Result<()> {
    let path = target_path(&layout, revision, shard)?;
    let text = fs::read_to_string(&dump)?;
    let loaded = verify::load_index(&text)?;

    let mut body = fs::read(&path)?;
    let l2p_offset = body.len() as u64;
    body.extend_from_slice(&loaded.l2p.encode(loaded.page_size));
    let p2l_offset = body.len() as u64;
    body.extend_from_slice(&loaded.p2l.encode());
    body.extend_from_slice(&revfile::Footer::new(l2p_offset, p2l_offset).encode());

    let tmp_path = path.with_file_name(format!(
        "{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("load-index")
    ));
    fs::write(&tmp_path, &body)?;
    fs::rename(&tmp_path, &path)?;

    println!(
        "ok: reloaded {} revisions, {} blocks from {:?}",
        loaded.l2p.revision_count(),
        loaded.p2l.block_count(),
        dump
    );
    Ok(())
}

fn verify_file(layout: Layout, revision: Option<Revision>, shard: Option<Shard>, skip_checksums: bool) -> Result<()> {
    let path = target_path(&layout, revision, shard)?;
    let (mut file, reader) = open_reader(&path)?;
    let (l2p, p2l) = match reader {
        revfile::Reader::Logical { l2p, p2l } => (l2p, p2l),
        revfile::Reader::Physical(_) => {
            println!("physical addressing predates the L2P/P2L indexes; nothing to verify");
            return Ok(());
        }
    };

    let mut report = verify::verify_cross_reference(&l2p, &p2l, &|| false);
    if !skip_checksums {
        let checksum_report = verify::verify_checksums(
            &p2l,
            &mut |offset, size| revfile::read_item_bytes(&mut file, offset, size),
            &|| false,
        )?;
        report.merge(checksum_report);
    }

    println!(
        "[{}] checked {} items, {} findings",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        report.items_checked,
        report.findings.len()
    );
    for finding in report.findings.iter() {
        println!("  {:?}", finding);
    }
    if report.is_clean() {
        Ok(())
    } else {
        err_at!(CorruptRevFile, msg: "{} findings", report.findings.len())
    }
}

fn pack_shard(
    root: std::path::PathBuf,
    max_files_per_dir: u64,
    shard: Shard,
    block_size: u64,
    page_size: u64,
    entries_per_page: u64,
) -> Result<()> {
    let repo = Repository::open(root, max_files_per_dir)?;
    let layout = repo.layout();
    let current_revision = repo.current_revision()?;

    let first_rev = shard * max_files_per_dir;
    let last_rev = ((shard + 1) * max_files_per_dir - 1).min(current_revision);
    if first_rev > last_rev {
        return err_at!(InvalidInput, msg: "shard {} has no committed revisions yet", shard);
    }

    use rayon::prelude::*;

    let mut shard_items: Vec<pack::RevisionItems> = (first_rev..=last_rev)
        .into_par_iter()
        .map(|revision| pack::read_revision_items(layout, revision))
        .collect::<Result<Vec<_>>>()?;
    shard_items.sort_by_key(|item| item.revision);

    let packer = pack::Packer::new(block_size, page_size, entries_per_page);
    repo.pack_shard(shard, shard_items, &packer)?;
    println!("packed shard {} (revisions {}..{})", shard, first_rev, last_rev);
    Ok(())
}
