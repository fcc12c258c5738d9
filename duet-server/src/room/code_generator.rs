use duet_core::RoomCode;
use rand::Rng;

const LOWEST_CODE: u32 = 100_000;
const HIGHEST_CODE: u32 = 999_999;

/// Source of candidate room codes. Uniqueness is enforced by the registry, not here.
pub trait CodeGenerator: Send + Sync {
    fn next_code(&self) -> RoomCode;

    /// How many distinct codes this generator can produce.
    fn capacity(&self) -> usize {
        (HIGHEST_CODE - LOWEST_CODE + 1) as usize
    }
}

/// Uniform draw over six-digit codes without a leading zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn next_code(&self) -> RoomCode {
        let value = rand::thread_rng().gen_range(LOWEST_CODE..=HIGHEST_CODE);
        RoomCode::from_number(value).unwrap_or_else(|_| unreachable!("code range is six digits"))
    }
}
