//! FUSE bridge
//!
//! Translates host filesystem callbacks into database operations. The
//! virtual tree is one directory deep: the root lists every long name,
//! and any other path is a leaf backed by an audio file under `MUSIC/`.
//!
//! The kernel speaks inodes, the database speaks names, so leaves are
//! interned into an ino table on first lookup. Open files live in an
//! fh table and are accessed positionally; no seek state is kept.

use std::collections::HashMap;
use std::ffi::{CString, OsStr};
use std::fs::{File, FileTimes, OpenOptions};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileExt, MetadataExt, OpenOptionsExt};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, Request,
    TimeOrNow,
};

use crate::db::Db;
use crate::paths::strip_leading_slashes;

/// Kernel attribute cache validity.
const TTL: Duration = Duration::from_secs(1);

/// Inode of the single directory.
const ROOT_INO: u64 = 1;

pub struct Db5Filesystem {
    db: Db,
    mount_time: SystemTime,
    inodes: HashMap<u64, String>,
    inodes_by_name: HashMap<String, u64>,
    next_ino: u64,
    handles: HashMap<u64, File>,
    next_fh: u64,
}

/// Seconds+nanos of a timestamp-ish value, clamped at the epoch.
fn system_time(secs: i64, nanos: i64) -> SystemTime {
    if secs < 0 {
        return UNIX_EPOCH;
    }
    UNIX_EPOCH + Duration::new(secs as u64, nanos as u32)
}

fn resolve_time(time: TimeOrNow) -> SystemTime {
    match time {
        TimeOrNow::SpecificTime(t) => t,
        TimeOrNow::Now => SystemTime::now(),
    }
}

/// OpenOptions for a raw set of POSIX open flags.
fn open_options(flags: i32) -> OpenOptions {
    let mut options = OpenOptions::new();
    match flags & libc::O_ACCMODE {
        libc::O_WRONLY => {
            options.write(true);
        }
        libc::O_RDWR => {
            options.read(true).write(true);
        }
        _ => {
            options.read(true);
        }
    }
    if flags & libc::O_APPEND != 0 {
        options.append(true);
    }
    if flags & libc::O_TRUNC != 0 {
        options.truncate(true);
    }
    options
}

impl Db5Filesystem {
    pub fn new(db: Db) -> Self {
        Self {
            db,
            mount_time: SystemTime::now(),
            inodes: HashMap::new(),
            inodes_by_name: HashMap::new(),
            next_ino: ROOT_INO + 1,
            handles: HashMap::new(),
            next_fh: 1,
        }
    }

    /// Ino for a long name, allocating on first sight.
    fn intern(&mut self, name: &str) -> u64 {
        if let Some(&ino) = self.inodes_by_name.get(name) {
            return ino;
        }
        let ino = self.next_ino;
        self.next_ino += 1;
        self.inodes.insert(ino, name.to_string());
        self.inodes_by_name.insert(name.to_string(), ino);
        ino
    }

    fn forget_name(&mut self, name: &str) {
        if let Some(ino) = self.inodes_by_name.remove(name) {
            self.inodes.remove(&ino);
        }
    }

    fn name_of(&self, ino: u64) -> Option<String> {
        self.inodes.get(&ino).cloned()
    }

    fn root_attr(&self, req: &Request<'_>) -> FileAttr {
        FileAttr {
            ino: ROOT_INO,
            size: self.db.count() as u64,
            blocks: 0,
            atime: self.mount_time,
            mtime: self.mount_time,
            ctime: self.mount_time,
            crtime: self.mount_time,
            kind: FileType::Directory,
            perm: 0o755,
            nlink: 2,
            uid: req.uid(),
            gid: req.gid(),
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }

    fn file_attr(&self, req: &Request<'_>, ino: u64, md: &std::fs::Metadata) -> FileAttr {
        FileAttr {
            ino,
            size: md.len(),
            blocks: md.blocks(),
            atime: system_time(md.atime(), md.atime_nsec()),
            mtime: system_time(md.mtime(), md.mtime_nsec()),
            ctime: system_time(md.ctime(), md.ctime_nsec()),
            crtime: UNIX_EPOCH,
            kind: FileType::RegularFile,
            perm: 0o644,
            nlink: 1,
            uid: req.uid(),
            gid: req.gid(),
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }

    /// Local audio file behind an ino; errno on failure.
    fn local_path(&mut self, ino: u64) -> Result<PathBuf, i32> {
        let name = self.name_of(ino).ok_or(libc::ENOENT)?;
        self.db.local_path_of(&name).map_err(|e| e.errno())
    }
}

impl Filesystem for Db5Filesystem {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), libc::c_int> {
        log::info!("filesystem initialised, {} file(s) in database", self.db.count());
        Ok(())
    }

    fn destroy(&mut self) {
        log::info!("building indexes");
        if let Err(e) = self.db.reindex() {
            log::error!("unable to rebuild indexes on unmount: {}", e);
        }
        log::info!("exiting filesystem");
    }

    fn lookup(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        if parent != ROOT_INO {
            reply.error(libc::ENOENT);
            return;
        }
        let name = match name.to_str() {
            Some(name) => name.to_string(),
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        let local = match self.db.local_path_of(&name) {
            Ok(local) => local,
            Err(e) => {
                reply.error(e.errno());
                return;
            }
        };
        let md = match std::fs::metadata(&local) {
            Ok(md) => md,
            Err(e) => {
                log::warn!("unable to stat local file {:?}: {}", local, e);
                reply.error(e.raw_os_error().unwrap_or(libc::EIO));
                return;
            }
        };

        let ino = self.intern(&name);
        reply.entry(&TTL, &self.file_attr(req, ino, &md), 0);
    }

    fn getattr(&mut self, req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        log::debug!("getattr called, ino {}", ino);

        if ino == ROOT_INO {
            reply.attr(&TTL, &self.root_attr(req));
            return;
        }

        let local = match self.local_path(ino) {
            Ok(local) => local,
            Err(errno) => {
                reply.error(errno);
                return;
            }
        };
        match std::fs::metadata(&local) {
            Ok(md) => reply.attr(&TTL, &self.file_attr(req, ino, &md)),
            Err(e) => {
                log::warn!("unable to stat local file {:?}: {}", local, e);
                reply.error(e.raw_os_error().unwrap_or(libc::EIO));
            }
        }
    }

    fn setattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        log::debug!("setattr called, ino {}", ino);

        let local = match self.local_path(ino) {
            Ok(local) => local,
            Err(errno) => {
                reply.error(errno);
                return;
            }
        };

        if let Some(size) = size {
            let result = match fh.and_then(|fh| self.handles.get(&fh)) {
                Some(file) => file.set_len(size),
                None => OpenOptions::new()
                    .write(true)
                    .open(&local)
                    .and_then(|file| file.set_len(size)),
            };
            if let Err(e) = result {
                log::error!("unable to truncate local file {:?}: {}", local, e);
                reply.error(e.raw_os_error().unwrap_or(libc::EIO));
                return;
            }
        }

        if atime.is_some() || mtime.is_some() {
            let mut times = FileTimes::new();
            if let Some(atime) = atime {
                times = times.set_accessed(resolve_time(atime));
            }
            if let Some(mtime) = mtime {
                times = times.set_modified(resolve_time(mtime));
            }
            let result = OpenOptions::new()
                .write(true)
                .open(&local)
                .and_then(|file| file.set_times(times));
            if let Err(e) = result {
                log::error!("unable to set times on local file {:?}: {}", local, e);
                reply.error(e.raw_os_error().unwrap_or(libc::EIO));
                return;
            }
        }

        match std::fs::metadata(&local) {
            Ok(md) => reply.attr(&TTL, &self.file_attr(req, ino, &md)),
            Err(e) => reply.error(e.raw_os_error().unwrap_or(libc::EIO)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        log::debug!("readdir called, ino {} offset {}", ino, offset);

        if ino != ROOT_INO {
            reply.error(libc::ENOENT);
            return;
        }

        let names = match self.db.list_longnames() {
            Ok(names) => names,
            Err(e) => {
                log::error!("unable to list database entries: {}", e);
                reply.error(libc::EIO);
                return;
            }
        };

        let mut entries: Vec<(u64, FileType, String)> = vec![
            (ROOT_INO, FileType::Directory, ".".to_string()),
            (ROOT_INO, FileType::Directory, "..".to_string()),
        ];
        for name in names {
            let ino = self.intern(&name);
            entries.push((ino, FileType::RegularFile, name));
        }

        for (i, (ino, kind, name)) in entries.into_iter().enumerate().skip(offset as usize) {
            if reply.add(ino, (i + 1) as i64, kind, &name) {
                break;
            }
        }
        reply.ok();
    }

    fn create(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        if parent != ROOT_INO {
            reply.error(libc::ENOENT);
            return;
        }
        let name = match name.to_str() {
            Some(name) => strip_leading_slashes(name).to_string(),
            None => {
                reply.error(libc::EINVAL);
                return;
            }
        };
        log::info!("create called, '{}'", name);

        if self.db.exists(&name) {
            log::info!("file '{}' already exists", name);
            reply.error(libc::EEXIST);
            return;
        }
        if let Err(e) = self.db.insert(&name) {
            log::error!("unable to insert '{}' in database: {}", name, e);
            reply.error(e.errno());
            return;
        }

        let local = match self.db.local_path_of(&name) {
            Ok(local) => local,
            Err(e) => {
                log::error!("unable to retrieve local file of '{}': {}", name, e);
                reply.error(e.errno());
                return;
            }
        };

        let file = match open_options(flags).create(true).mode(0o644).open(&local) {
            Ok(file) => file,
            Err(e) => {
                log::error!("open failed for {:?}: {}", local, e);
                reply.error(e.raw_os_error().unwrap_or(libc::EIO));
                return;
            }
        };
        let md = match file.metadata() {
            Ok(md) => md,
            Err(e) => {
                reply.error(e.raw_os_error().unwrap_or(libc::EIO));
                return;
            }
        };

        let ino = self.intern(&name);
        let fh = self.next_fh;
        self.next_fh += 1;
        self.handles.insert(fh, file);

        reply.created(&TTL, &self.file_attr(req, ino, &md), 0, fh, 0);
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        log::info!("open called, ino {}", ino);

        let local = match self.local_path(ino) {
            Ok(local) => local,
            Err(errno) => {
                reply.error(errno);
                return;
            }
        };

        match open_options(flags).open(&local) {
            Ok(file) => {
                let fh = self.next_fh;
                self.next_fh += 1;
                self.handles.insert(fh, file);
                reply.opened(fh, 0);
            }
            Err(e) => {
                log::error!("open failed for {:?}: {}", local, e);
                reply.error(e.raw_os_error().unwrap_or(libc::EIO));
            }
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let file = match self.handles.get(&fh) {
            Some(file) => file,
            None => {
                reply.error(libc::EBADF);
                return;
            }
        };

        let mut buffer = vec![0u8; size as usize];
        let mut filled = 0usize;
        while filled < buffer.len() {
            match file.read_at(&mut buffer[filled..], offset as u64 + filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) => {
                    log::warn!("read failed: {}", e);
                    reply.error(e.raw_os_error().unwrap_or(libc::EIO));
                    return;
                }
            }
        }
        reply.data(&buffer[..filled]);
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let file = match self.handles.get(&fh) {
            Some(file) => file,
            None => {
                reply.error(libc::EBADF);
                return;
            }
        };

        match file.write_all_at(data, offset as u64) {
            Ok(()) => reply.written(data.len() as u32),
            Err(e) => {
                log::warn!("write failed: {}", e);
                reply.error(e.raw_os_error().unwrap_or(libc::EIO));
            }
        }
    }

    fn flush(&mut self, _req: &Request<'_>, ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        log::info!("flush called, ino {}", ino);

        // Refresh the audio metadata now that writes have settled.
        if let Some(name) = self.name_of(ino) {
            if let Err(e) = self.db.update(&name) {
                log::warn!("unable to update database for '{}': {}", name, e);
            }
        }
        reply.ok();
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        self.handles.remove(&fh);
        reply.ok();
    }

    fn fsync(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, datasync: bool, reply: ReplyEmpty) {
        let file = match self.handles.get(&fh) {
            Some(file) => file,
            None => {
                reply.error(libc::EBADF);
                return;
            }
        };

        let result = if datasync {
            file.sync_data()
        } else {
            file.sync_all()
        };
        match result {
            Ok(()) => reply.ok(),
            Err(e) => {
                log::error!("sync failed: {}", e);
                reply.error(e.raw_os_error().unwrap_or(libc::EIO));
            }
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        if parent != ROOT_INO {
            reply.error(libc::ENOENT);
            return;
        }
        let name = match name.to_str() {
            Some(name) => name.to_string(),
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };
        log::info!("unlink called, '{}'", name);

        let local = match self.db.local_path_of(&name) {
            Ok(local) => local,
            Err(e) => {
                reply.error(e.errno());
                return;
            }
        };

        if let Err(e) = self.db.delete(&name) {
            log::error!("unable to remove '{}' from database: {}", name, e);
            reply.error(libc::EIO);
            return;
        }

        // The database entry is gone; a stale audio file is harmless.
        if let Err(e) = std::fs::remove_file(&local) {
            log::warn!("unable to remove local file {:?}: {}", local, e);
        }

        self.forget_name(&name);
        reply.ok();
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        if parent != ROOT_INO || newparent != ROOT_INO {
            reply.error(libc::ENOENT);
            return;
        }
        let (src, dst) = match (name.to_str(), newname.to_str()) {
            (Some(src), Some(dst)) => (src.to_string(), dst.to_string()),
            _ => {
                reply.error(libc::EINVAL);
                return;
            }
        };
        log::info!("rename called, '{}' -> '{}'", src, dst);

        if !self.db.exists(&src) {
            reply.error(libc::ENOENT);
            return;
        }
        if self.db.exists(&dst) {
            reply.error(libc::EEXIST);
            return;
        }

        let local_src = match self.db.local_path_of(&src) {
            Ok(local) => local,
            Err(e) => {
                reply.error(e.errno());
                return;
            }
        };

        if let Err(e) = self.db.insert(&dst) {
            log::error!("unable to insert '{}' in database: {}", dst, e);
            reply.error(libc::EIO);
            return;
        }
        let local_dst = match self.db.local_path_of(&dst) {
            Ok(local) => local,
            Err(e) => {
                reply.error(e.errno());
                return;
            }
        };

        if let Err(e) = std::fs::rename(&local_src, &local_dst) {
            log::error!(
                "unable to rename local file {:?} -> {:?}: {}",
                local_src,
                local_dst,
                e
            );
            reply.error(e.raw_os_error().unwrap_or(libc::EIO));
            return;
        }

        if let Err(e) = self.db.delete(&src) {
            log::error!("unable to remove '{}' from database: {}", src, e);
            reply.error(libc::EIO);
            return;
        }

        // Refresh the new entry; failure only means stale metadata.
        if let Err(e) = self.db.update(&dst) {
            log::warn!("unable to update database for '{}': {}", dst, e);
        }

        self.forget_name(&src);
        self.forget_name(&dst);
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        let path = match CString::new(self.db.data_dir().as_os_str().as_bytes()) {
            Ok(path) => path,
            Err(_) => {
                reply.error(libc::EINVAL);
                return;
            }
        };

        let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::statvfs(path.as_ptr(), &mut stat) };
        if rc != 0 {
            let e = std::io::Error::last_os_error();
            log::error!("statvfs failed: {}", e);
            reply.error(e.raw_os_error().unwrap_or(libc::EIO));
            return;
        }

        reply.statfs(
            stat.f_blocks as u64,
            stat.f_bfree as u64,
            stat.f_bavail as u64,
            stat.f_files as u64,
            stat.f_ffree as u64,
            stat.f_bsize as u32,
            stat.f_namemax as u32,
            stat.f_frsize as u32,
        );
    }
}
