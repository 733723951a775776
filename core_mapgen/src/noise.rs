//! Hash-based value noise used for per-cell jitter.

/// Deterministic fractal value noise over offset coordinates.
#[derive(Debug, Clone, Copy)]
pub struct NoiseField {
    seed: u32,
    frequency: f32,
    octaves: u32,
}

impl NoiseField {
    pub fn new(seed: u64, salt: u32, frequency: f32, octaves: u32) -> Self {
        Self {
            seed: fold_seed(seed, salt),
            frequency: frequency.max(f32::EPSILON),
            octaves: octaves.max(1),
        }
    }

    /// Noise in `[0, 1]`.
    pub fn sample(&self, x: i32, z: i32) -> f32 {
        let fx = x as f32 * self.frequency;
        let fz = z as f32 * self.frequency;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut sum = 0.0;
        let mut norm = 0.0;
        for octave in 0..self.octaves {
            let s = self.seed.wrapping_add(octave.wrapping_mul(0x9E37));
            sum += lattice_noise(fx * frequency, fz * frequency, s) * amplitude;
            norm += amplitude;
            frequency *= 2.0;
            amplitude *= 0.5;
        }
        (sum / norm).clamp(0.0, 1.0)
    }

    /// Noise remapped to `[-1, 1]`.
    pub fn signed(&self, x: i32, z: i32) -> f32 {
        self.sample(x, z) * 2.0 - 1.0
    }
}

fn lattice_noise(x: f32, z: f32, seed: u32) -> f32 {
    let x0 = x.floor() as i32;
    let z0 = z.floor() as i32;
    let tx = fade(x - x0 as f32);
    let tz = fade(z - z0 as f32);

    let south = lerp(hash_cell(x0, z0, seed), hash_cell(x0 + 1, z0, seed), tx);
    let north = lerp(
        hash_cell(x0, z0 + 1, seed),
        hash_cell(x0 + 1, z0 + 1, seed),
        tx,
    );
    lerp(south, north, tz)
}

fn fade(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn hash_cell(x: i32, z: i32, seed: u32) -> f32 {
    let mut n = (x as u32).wrapping_mul(0x6C8E_9CF5) ^ (z as u32).wrapping_mul(0xB529_7A4D) ^ seed;
    n ^= n >> 13;
    n = n.wrapping_mul(0x1B56_C4E9);
    n ^= n >> 11;
    ((n >> 8) & 0xFFFF) as f32 / 65535.0
}

fn fold_seed(seed: u64, salt: u32) -> u32 {
    (seed as u32).rotate_left(7) ^ ((seed >> 32) as u32).rotate_left(11) ^ salt
}
