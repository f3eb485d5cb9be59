//! Identifiers and codes of the built-in checks.

pub const CHECK_REPO_README_PRESENT: &str = "repo.readme_present";
pub const CHECK_REPO_LICENSE_PRESENT: &str = "repo.license_present";
pub const CHECK_REPO_NO_STRAY_FILES: &str = "repo.no_stray_files";
pub const CHECK_DOCS_INDEX_PRESENT: &str = "docs.index_present";
pub const CHECK_MAKE_HELP_TARGET: &str = "make.help_target";
pub const CHECK_EVIDENCE_TREE_INVENTORY: &str = "evidence.tree_inventory";
pub const CHECK_VCS_WORKTREE_CLEAN: &str = "vcs.worktree_clean";

pub const CODE_MISSING_FILE: &str = "missing_file";
pub const CODE_STRAY_FILE: &str = "stray_file";
pub const CODE_MISSING_HELP_TARGET: &str = "missing_help_target";
pub const CODE_DIRTY_WORKTREE: &str = "dirty_worktree";
