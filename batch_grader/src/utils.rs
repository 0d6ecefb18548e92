use std::{fs, io, path::Path};

/// Derives the student identifier from a repository directory name.
///
/// Classroom names repositories `<assignment-prefix>-<username>`; `parts`
/// selects how many trailing dash-separated segments to keep, for rosters
/// where the identifier itself contains a dash.
pub fn student_name_from_repo(repo_name: &str, parts: usize) -> String {
    let segments: Vec<&str> = repo_name.split('-').collect();
    let keep = parts.clamp(1, segments.len());
    segments[segments.len() - keep..].join("-")
}

/// Copies the contents of `src` into `dst` recursively, overwriting files
/// that already exist.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
