//! 宏库缓存（.fcdl）
//!
//! 解析过的宏库以 MessagePack + Zstd 保存，下次启动时只要缓存比库目录中
//! 所有 .fcl 文件都新，就直接读取缓存。

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use fidocad_core::library::Library;
use serde::{Deserialize, Serialize};

use crate::error::FileError;
use crate::fcd::{library_files, load_library_dir};

/// 文件魔数 "FCDL"
const MAGIC: &[u8; 4] = b"FCDL";

/// 当前缓存格式版本
const FORMAT_VERSION: u32 = 1;

/// Zstd 压缩级别
const COMPRESSION_LEVEL: i32 = 3;

/// 缓存文件头：魔数、格式版本、压缩后宏库的字节数（共 12 字节）
#[derive(Debug)]
struct CacheHeader {
    version: u32,
    payload_len: u32,
}

impl CacheHeader {
    const SIZE: u64 = 12;

    fn current(payload_len: u32) -> Self {
        Self {
            version: FORMAT_VERSION,
            payload_len,
        }
    }

    fn write(&self, writer: &mut impl Write) -> Result<(), std::io::Error> {
        writer.write_all(MAGIC)?;
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&self.payload_len.to_le_bytes())
    }

    /// 读取并校验文件头，拒绝非缓存文件和更新版本的缓存
    fn read(reader: &mut impl Read) -> Result<Self, FileError> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(FileError::InvalidFormat(
                "Invalid magic number, not a library cache".to_string(),
            ));
        }

        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        let version = u32::from_le_bytes(buf);
        if version > FORMAT_VERSION {
            return Err(FileError::UnsupportedVersion(format!(
                "Cache version {} is newer than supported version {}",
                version, FORMAT_VERSION
            )));
        }
        reader.read_exact(&mut buf)?;
        Ok(Self {
            version,
            payload_len: u32::from_le_bytes(buf),
        })
    }
}

/// 缓存内容
#[derive(Debug, Serialize, Deserialize)]
struct CacheContent {
    created: DateTime<Utc>,
    library: Library,
}

/// 保存宏库缓存
pub fn save_cache(library: &Library, path: &Path) -> Result<(), FileError> {
    let content = CacheContent {
        created: Utc::now(),
        library: library.clone(),
    };
    let msgpack_data = rmp_serde::to_vec(&content)?;
    let compressed_data = zstd::encode_all(msgpack_data.as_slice(), COMPRESSION_LEVEL)?;

    let mut writer = BufWriter::new(File::create(path)?);
    CacheHeader::current(compressed_data.len() as u32).write(&mut writer)?;
    writer.write_all(&compressed_data)?;
    writer.flush()?;

    tracing::info!(
        "Saved library cache with {} macros to {} ({} bytes compressed)",
        library.len(),
        path.display(),
        compressed_data.len()
    );
    Ok(())
}

/// 读取宏库缓存
pub fn load_cache(path: &Path) -> Result<Library, FileError> {
    let mut reader = BufReader::new(File::open(path)?);
    let header = CacheHeader::read(&mut reader)?;

    let mut compressed_data = vec![0u8; header.payload_len as usize];
    reader.read_exact(&mut compressed_data)?;
    let msgpack_data = zstd::decode_all(compressed_data.as_slice())?;
    let content: CacheContent = rmp_serde::from_slice(&msgpack_data)?;

    tracing::info!(
        "Loaded library cache with {} macros from {} (created {})",
        content.library.len(),
        path.display(),
        content.created.to_rfc3339()
    );
    Ok(content.library)
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// 缓存是否比目录中所有库文件都新
pub fn is_fresh(cache: &Path, dir: &Path) -> Result<bool, FileError> {
    let Some(cached_at) = modified(cache) else {
        return Ok(false);
    };
    let newest = library_files(dir)?
        .iter()
        .filter_map(|f| modified(f))
        .max();
    Ok(newest.map_or(true, |t| t <= cached_at))
}

/// 读取库目录，缓存有效时直接用缓存，否则重新解析并写回缓存
pub fn load_library_cached(dir: &Path, cache: &Path) -> Result<Library, FileError> {
    if is_fresh(cache, dir)? {
        match load_cache(cache) {
            Ok(library) => return Ok(library),
            Err(e) => tracing::warn!("Ignoring library cache {}: {}", cache.display(), e),
        }
    }
    let library = load_library_dir(dir)?;
    if let Err(e) = save_cache(&library, cache) {
        tracing::warn!("Could not write library cache {}: {}", cache.display(), e);
    }
    Ok(library)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fidocad_core::parser::read_library;

    #[test]
    fn test_save_load_roundtrip() {
        let path = std::env::temp_dir().join("fidocad_test_library.fcdl");
        let library = read_library("[FIDOLIB Test]\n{Cat}\n[A1 First]\nLI 0 0 5 5 0\n", "test")
            .expect("Failed to read library");

        save_cache(&library, &path).expect("Failed to save");

        let mut reader = BufReader::new(File::open(&path).expect("Failed to open"));
        let header = CacheHeader::read(&mut reader).expect("Failed to read header");
        assert_eq!(header.version, FORMAT_VERSION);
        let file_len = fs::metadata(&path).expect("Failed to stat").len();
        assert_eq!(file_len, CacheHeader::SIZE + header.payload_len as u64);

        let loaded = load_cache(&path).expect("Failed to load");
        assert_eq!(loaded, library);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_invalid_magic() {
        let path = std::env::temp_dir().join("fidocad_test_invalid.fcdl");
        let mut file = File::create(&path).expect("Failed to create");
        file.write_all(b"FCD0").expect("Failed to write");
        file.write_all(&[0u8; 8]).expect("Failed to write padding");

        assert!(matches!(load_cache(&path), Err(FileError::InvalidFormat(_))));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_newer_version_and_truncated_payload() {
        let path = std::env::temp_dir().join("fidocad_test_header.fcdl");
        let mut bytes = Vec::new();
        CacheHeader {
            version: FORMAT_VERSION + 1,
            payload_len: 0,
        }
        .write(&mut bytes)
        .expect("Failed to write header");
        fs::write(&path, &bytes).expect("Failed to write");
        assert!(matches!(load_cache(&path), Err(FileError::UnsupportedVersion(_))));

        let mut bytes = Vec::new();
        CacheHeader::current(64)
            .write(&mut bytes)
            .expect("Failed to write header");
        bytes.extend_from_slice(&[0u8; 10]);
        fs::write(&path, &bytes).expect("Failed to write");
        assert!(load_cache(&path).is_err());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_cached_load_creates_cache() {
        let dir = std::env::temp_dir().join("fidocad_cache_dir");
        fs::create_dir_all(&dir).expect("Failed to create dir");
        fs::write(dir.join("lib.fcl"), "[K1 Key]\nSA 0 0 0\n").expect("Failed to write");
        let cache = dir.join("cache.fcdl");
        fs::remove_file(&cache).ok();

        let first = load_library_cached(&dir, &cache).expect("Failed to load");
        assert!(cache.exists());
        assert!(is_fresh(&cache, &dir).expect("Failed to check cache"));
        let second = load_library_cached(&dir, &cache).expect("Failed to load");
        assert_eq!(first, second);
        assert!(second.get("lib.k1").is_some());

        fs::remove_dir_all(&dir).ok();
    }
}
