//! Set algebra over sorted index lists

use super::AbsoluteIndex;

/// Intersection of two ascending index lists
pub fn intersect(a: &[AbsoluteIndex], b: &[AbsoluteIndex]) -> Vec<AbsoluteIndex> {
    let mut result = Vec::with_capacity(a.len().min(b.len()));
    let (mut ai, mut bi) = (0, 0);

    while ai < a.len() && bi < b.len() {
        match a[ai].cmp(&b[bi]) {
            std::cmp::Ordering::Less => ai += 1,
            std::cmp::Ordering::Greater => bi += 1,
            std::cmp::Ordering::Equal => {
                result.push(a[ai]);
                ai += 1;
                bi += 1;
            }
        }
    }
    result
}

/// Union of two ascending index lists, without duplicates
pub fn union(a: &[AbsoluteIndex], b: &[AbsoluteIndex]) -> Vec<AbsoluteIndex> {
    let mut result = Vec::with_capacity(a.len() + b.len());
    let (mut ai, mut bi) = (0, 0);

    while ai < a.len() && bi < b.len() {
        match a[ai].cmp(&b[bi]) {
            std::cmp::Ordering::Less => {
                result.push(a[ai]);
                ai += 1;
            }
            std::cmp::Ordering::Greater => {
                result.push(b[bi]);
                bi += 1;
            }
            std::cmp::Ordering::Equal => {
                result.push(a[ai]);
                ai += 1;
                bi += 1;
            }
        }
    }
    // At most one of these still has entries
    result.extend_from_slice(&a[ai..]);
    result.extend_from_slice(&b[bi..]);
    result
}
