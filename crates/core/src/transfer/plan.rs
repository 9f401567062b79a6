//! Splitting a file into multipart ranges

use crate::error::PlanError;

/// Most parts a single multipart upload may have
pub const MAX_PARTS: u64 = 10_000;

/// One planned part of a multipart upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartDescriptor {
    /// 1-based
    pub part_number: i32,
    pub offset: u64,
    pub length: u64,
}

/// Plan the byte ranges covering `[0, total_size)`
///
/// Every part is `part_size` bytes long except possibly the last. An empty
/// source produces no parts; callers must not start a multipart upload for
/// it.
pub fn plan_parts(total_size: u64, part_size: u64) -> Result<Vec<PartDescriptor>, PlanError> {
    if part_size == 0 {
        return Err(PlanError::ZeroPartSize);
    }

    let count = total_size.div_ceil(part_size);
    if count > MAX_PARTS {
        return Err(PlanError::TooManyParts {
            parts: count,
            max: MAX_PARTS,
        });
    }

    let mut parts = Vec::with_capacity(count as usize);
    let mut offset = 0;
    let mut part_number = 1;

    while offset < total_size {
        let length = part_size.min(total_size - offset);
        parts.push(PartDescriptor {
            part_number,
            offset,
            length,
        });
        offset += length;
        part_number += 1;
    }

    Ok(parts)
}
