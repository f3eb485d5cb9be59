pub mod docs;
pub mod evidence;
pub mod make;
pub mod repo;
pub mod vcs;

#[cfg(test)]
pub(crate) mod test_support {
    use camino::{Utf8Path, Utf8PathBuf};
    use checkguard_engine::{
        CheckResult, RunContext, RunEnv, RunFlags, load, new_run_context, run_sandboxed,
    };
    use tempfile::TempDir;

    pub fn repo_with(files: &[(&str, &str)]) -> (TempDir, Utf8PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(tmp.path().canonicalize().unwrap()).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        for (path, contents) in files {
            let full = root.join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, contents).unwrap();
        }
        (tmp, root)
    }

    pub fn context(root: &Utf8Path) -> RunContext {
        let flags = RunFlags {
            start_dir: root.to_path_buf(),
            run_id: Some("catalog-test".to_string()),
            ..RunFlags::default()
        };
        new_run_context(&flags, &RunEnv::default()).unwrap()
    }

    pub fn run_builtin(id: &str, ctx: &RunContext) -> CheckResult {
        let snapshot = load(&[crate::builtin()]).unwrap();
        let check = snapshot.check(id).unwrap();
        run_sandboxed(check, ctx)
    }
}
