#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::{tempdir, TempDir};

pub const NM_OLD: &str = include_str!("../fixtures/nm_symbols.txt");
pub const NM_NEW: &str = "\
0000000000a95240 0000000000000008 B encoding/xml.HTMLEntity
0000000000a95258 0000000000000008 B encoding/xml.tinfoMap
00000000008d2f18 0000000000000008 r $f64.0010000000000000
00000000008d2f20 0000000000000008 r $f64.3cb0000000000000
0000000000456730 0000000000000013 T runtime.prefetchnta
0000000000456700 0000000000000009 T runtime.prefetcht0
0000000000a95300 0000000000000020 B main.added
";
pub const READELF: &str = include_str!("../fixtures/readelf_sections.txt");
pub const OBJDUMP: &str = include_str!("../fixtures/gnu_objdump.txt");

/// A scratch directory with two input binaries and fake inspection tools.
///
/// Each fake tool prints the `*.old.txt` listing when its last argument ends
/// in `.old` and the `*.new.txt` listing otherwise.
pub struct Workspace {
    pub dir: TempDir,
    pub old: PathBuf,
    pub new: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempdir().unwrap();
        let old = dir.path().join("app.old");
        let new = dir.path().join("app.new");
        fs::write(&old, b"old-binary").unwrap();
        fs::write(&new, b"new-binary!").unwrap();
        let ws = Self { dir, old, new };
        ws.tool("nm", NM_OLD, NM_NEW, 0);
        ws.tool("readelf", READELF, &READELF.replace("0000000000011289", "0000000000011389"), 0);
        ws.tool("objdump", OBJDUMP, &OBJDUMP.replace("$0x48,%rsp", "$0x58,%rsp"), 0);
        ws
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// (Re)write the fake `name` tool.
    pub fn tool(&self, name: &str, old: &str, new: &str, exit_code: i32) {
        let old_out = self.path().join(format!("{name}.old.txt"));
        let new_out = self.path().join(format!("{name}.new.txt"));
        fs::write(&old_out, old).unwrap();
        fs::write(&new_out, new).unwrap();

        let script = self.path().join(name);
        let body = format!(
            "#!/bin/sh\n\
             for last; do :; done\n\
             case \"$last\" in\n\
             *.old) cat '{}' ;;\n\
             *) cat '{}' ;;\n\
             esac\n\
             exit {exit_code}\n",
            old_out.display(),
            new_out.display()
        );
        fs::write(&script, body).unwrap();
        make_executable(&script);
    }

    /// `bincmp` with the fake tools wired in through the environment.
    pub fn cmd(&self) -> Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("bincmp");
        cmd.env("BINCMP_NM", self.path().join("nm"))
            .env("BINCMP_READELF", self.path().join("readelf"))
            .env("BINCMP_OBJDUMP", self.path().join("objdump"))
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn compare(&self) -> Command {
        let mut cmd = self.cmd();
        cmd.arg(&self.old).arg(&self.new);
        cmd
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}
