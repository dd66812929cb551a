// crates/porep-seal/src/synthetic.rs

//! Synthetic piece data for benchmark runs.

use anyhow::{Context, Result};
use rand::RngCore;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write `size` random bytes drawn from `rng` to `path`, replacing any existing file.
pub fn create_fake_data_file<R: RngCore + ?Sized>(path: &Path, size: u64, rng: &mut R) -> Result<()> {
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    let mut buf = vec![0u8; 64 * 1024];
    let mut left = size;
    while left > 0 {
        let n = usize::try_from(left).map_or(buf.len(), |l| l.min(buf.len()));
        rng.fill_bytes(&mut buf[..n]);
        w.write_all(&buf[..n])
            .with_context(|| format!("writing {}", path.display()))?;
        left -= n as u64;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn writes_exact_size_deterministically() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.dat");
        let b = dir.path().join("b.dat");
        create_fake_data_file(&a, 70_000, &mut StdRng::seed_from_u64(5)).unwrap();
        create_fake_data_file(&b, 70_000, &mut StdRng::seed_from_u64(5)).unwrap();
        let bytes = std::fs::read(&a).unwrap();
        assert_eq!(bytes.len(), 70_000);
        assert_eq!(bytes, std::fs::read(&b).unwrap());
    }
}
