//! Command-line interface definitions for the `dme-aseries` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `dme-aseries` binary.
#[derive(Debug, Parser)]
#[command(
    name = "dme-aseries",
    about = "Provision and manage filesystem volumes on a DME A-series array",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Create a volume, or confirm that it already exists.
    #[command(name = "create", about = "Create a filesystem volume and its share")]
    Create(CreateCommand),
    /// Delete a volume and its shares.
    #[command(name = "delete", about = "Delete a volume, its shares, and its filesystem")]
    Delete(VolumeName),
    /// Grow a volume.
    #[command(name = "expand", about = "Grow a volume to a new size")]
    Expand(ExpandCommand),
    /// Show a volume.
    #[command(name = "query", about = "Show the id and size of a volume")]
    Query(VolumeName),
}

/// Arguments for the `dme-aseries create` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct CreateCommand {
    /// Volume name; also used as the filesystem name and share path.
    pub(crate) name: String,
    /// Requested size in bytes; rounded up to whole 512-byte sectors.
    #[arg(long, value_name = "BYTES")]
    pub(crate) size: u64,
    /// Storage pool to allocate the filesystem from.
    #[arg(long, value_name = "POOL")]
    pub(crate) pool: String,
    /// Share protocol.
    #[arg(long, default_value = "nfs", value_parser = ["nfs", "dtfs"])]
    pub(crate) protocol: String,
    /// NFS client (host, network, or `*`) granted read-write access.
    /// Repeat for several clients.
    #[arg(long = "client", value_name = "CLIENT")]
    pub(crate) clients: Vec<String>,
    /// DataTurbo administrator granted read-write access. Repeat for several
    /// users; unknown users are skipped.
    #[arg(long = "user", value_name = "USER")]
    pub(crate) users: Vec<String>,
    /// Keep client user identities instead of squashing them.
    #[arg(long)]
    pub(crate) no_all_squash: bool,
    /// Keep root privileges for NFS clients.
    #[arg(long)]
    pub(crate) no_root_squash: bool,
    /// Free-form filesystem description.
    #[arg(long, value_name = "TEXT")]
    pub(crate) description: Option<String>,
    /// Allocation type forwarded to the array (`thin` or `thick`).
    #[arg(long, value_name = "TYPE")]
    pub(crate) allocation_type: Option<String>,
}

/// Arguments for the `dme-aseries expand` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct ExpandCommand {
    /// Volume name.
    pub(crate) name: String,
    /// New size in bytes; must not be smaller than the current size.
    #[arg(long, value_name = "BYTES")]
    pub(crate) size: u64,
}

/// Volume selector shared by `delete` and `query`.
#[derive(Debug, Parser)]
pub(crate) struct VolumeName {
    /// Volume name.
    pub(crate) name: String,
}
