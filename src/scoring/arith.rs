/// Greatest common divisor (Euclid). `gcd(0, n) == n`.
pub fn gcd(a: u64, b: u64) -> u64 {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Least common multiple; zero if either side is zero.
///
/// `None` when the result does not fit in a `u64`.
pub fn lcm(a: u64, b: u64) -> Option<u64> {
    if a == 0 || b == 0 {
        return Some(0);
    }
    (a / gcd(a, b)).checked_mul(b)
}

/// Left fold of [`lcm`] over `values`. An empty list yields 1.
///
/// Callers pass positive integers only; zero entries collapse the result to 0.
pub fn lcm_of_list(values: &[u64]) -> Option<u64> {
    match values {
        [] => Some(1),
        [only] => Some(*only),
        [first, rest @ ..] => rest.iter().try_fold(*first, |acc, &v| lcm(acc, v)),
    }
}
