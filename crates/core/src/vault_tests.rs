use super::*;

#[test]
fn folder_dir_names_match_contract() {
    assert_eq!(VaultFolder::Inbox.dir_name(), "Inbox");
    assert_eq!(VaultFolder::NeedsAction.dir_name(), "Needs_Action");
    assert_eq!(VaultFolder::PendingApproval.dir_name(), "Pending_Approval");
    assert_eq!(VaultFolder::DeadLetter.dir_name(), "Dead_Letter");
}

#[test]
fn layout_resolves_paths_under_root() {
    let layout = VaultLayout::new("/tmp/vault");
    assert_eq!(layout.folder(VaultFolder::Inbox), PathBuf::from("/tmp/vault/Inbox"));
    assert_eq!(
        layout.lock_file("abc-123"),
        PathBuf::from("/tmp/vault/.locks/abc-123.lock")
    );
    assert_eq!(
        layout.audit_dir(),
        PathBuf::from("/tmp/vault/System_Log/Audit")
    );
}

#[test]
fn all_dirs_covers_every_pipeline_folder_plus_private_dirs() {
    let layout = VaultLayout::new("/tmp/vault");
    let dirs = layout.all_dirs();
    assert_eq!(dirs.len(), VaultFolder::ALL.len() + 4);
    assert!(dirs.contains(&layout.locks_dir()));
    assert!(dirs.contains(&layout.credentials_dir()));
    assert!(dirs.contains(&layout.integrity_dir()));
    assert!(dirs.contains(&layout.audit_dir()));
}

#[test]
fn file_names_share_the_stem() {
    let stem = "11111111-1111-1111-1111-111111111111";
    assert_eq!(action_file_name(stem), format!("{stem}.action.yaml"));
    assert_eq!(plan_file_name(stem), format!("{stem}.plan.md"));
    assert_eq!(approval_file_name(stem), format!("{stem}.approval.md"));
}
