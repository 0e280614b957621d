use rand::Rng;

pub const PNR_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const PNR_LENGTH: usize = 6;

/// Draws a fresh 6-character record locator. Uniqueness is enforced at write time.
pub fn generate_pnr() -> String {
    let mut rng = rand::thread_rng();
    (0..PNR_LENGTH)
        .map(|_| PNR_ALPHABET[rng.gen_range(0..PNR_ALPHABET.len())] as char)
        .collect()
}

pub fn is_valid_pnr(candidate: &str) -> bool {
    candidate.len() == PNR_LENGTH && candidate.bytes().all(|b| PNR_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_pnrs_are_well_formed() {
        for _ in 0..500 {
            let pnr = generate_pnr();
            assert!(is_valid_pnr(&pnr), "bad pnr {}", pnr);
        }
    }

    #[test]
    fn test_generated_pnrs_vary() {
        let seen: HashSet<String> = (0..200).map(|_| generate_pnr()).collect();
        assert!(seen.len() > 190);
    }

    #[test]
    fn test_validation() {
        assert!(is_valid_pnr("AB12CD"));
        assert!(!is_valid_pnr("ab12cd"));
        assert!(!is_valid_pnr("AB12C"));
        assert!(!is_valid_pnr("AB12CD7"));
        assert!(!is_valid_pnr("AB-2CD"));
    }
}
