use crate::graphics::constants::{INDICES_PER_QUAD, MAX_QUADS, VERTICES_PER_QUAD};

/// The six indices drawing quad slot `slot` as two triangles.
///
/// `slot` must be below [`MAX_QUADS`]; atlases never hold more.
pub fn quad_indices(slot: usize) -> [u32; INDICES_PER_QUAD] {
    debug_assert!(slot < MAX_QUADS, "quad slot {slot} has no 32-bit indices");
    let base = (slot * VERTICES_PER_QUAD) as u32;
    [base, base + 1, base + 2, base + 2, base + 3, base + 1]
}

/// Write the indices of quad slots `begin..begin + count` into `indices`.
///
/// `indices` holds six entries per slot and must already cover every written slot.
pub fn setup_indices(indices: &mut [u32], count: usize, begin: usize) {
    let start = begin * INDICES_PER_QUAD;
    let end = (begin + count) * INDICES_PER_QUAD;
    for (offset, run) in indices[start..end]
        .chunks_exact_mut(INDICES_PER_QUAD)
        .enumerate()
    {
        run.copy_from_slice(&quad_indices(begin + offset));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_slot_gets_its_own_run() {
        let capacity = 17;
        let mut indices = vec![0; capacity * INDICES_PER_QUAD];
        setup_indices(&mut indices, capacity, 0);

        for (i, run) in indices.chunks_exact(INDICES_PER_QUAD).enumerate() {
            let i = i as u32;
            assert_eq!(run, [4 * i, 4 * i + 1, 4 * i + 2, 4 * i + 2, 4 * i + 3, 4 * i + 1]);
        }
    }

    #[test]
    fn partial_setup_leaves_other_slots_alone() {
        let mut indices = vec![u32::MAX; 4 * INDICES_PER_QUAD];
        setup_indices(&mut indices, 2, 1);

        assert!(indices[..INDICES_PER_QUAD].iter().all(|&i| i == u32::MAX));
        assert_eq!(indices[INDICES_PER_QUAD..2 * INDICES_PER_QUAD], quad_indices(1));
        assert_eq!(indices[2 * INDICES_PER_QUAD..3 * INDICES_PER_QUAD], quad_indices(2));
        assert!(indices[3 * INDICES_PER_QUAD..].iter().all(|&i| i == u32::MAX));
    }

    #[test]
    fn last_slot_indices_fit_in_u32() {
        let last = quad_indices(MAX_QUADS - 1);
        assert_eq!(last[0] as usize, (MAX_QUADS - 1) * VERTICES_PER_QUAD);
        assert!(last.iter().all(|&i| (i as usize) < MAX_QUADS * VERTICES_PER_QUAD));
    }
}
