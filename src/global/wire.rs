//! Global batch wire format (§6.2): a flat, fixed-capacity integer buffer
//! shared by every global strategy.
//!
//! ```text
//! clause := lit1 lit2 ... litk lbd 0
//! buffer := clause* 0*                 // zero-padded to a fixed capacity
//! ```

use crate::clause::{ClauseRecord, ClauseRef, Origin};

/// Serializes as many of `clauses` as fit within `capacity` integers,
/// zero-padding the remainder. Clauses that do not fit are left in
/// `clauses` (removed from the front) so the caller can return them to the
/// local `toSend` database, per §4.8's "if a clause does not fit, it is
/// returned to the local toSend database".
pub fn serialize(clauses: &mut Vec<ClauseRef>, capacity: usize) -> Vec<i32> {
    let mut buf = Vec::with_capacity(capacity);
    let mut taken = 0;
    for clause in clauses.iter() {
        let needed = clause.size() + 2; // literals + lbd + terminator
        if buf.len() + needed > capacity {
            break;
        }
        buf.extend_from_slice(clause.literals());
        buf.push(clause.lbd() as i32);
        buf.push(0);
        taken += 1;
    }
    clauses.drain(..taken);
    buf.resize(capacity, 0);
    buf
}

/// Deserializes a buffer produced by `serialize` back into clause records,
/// splitting on the `0` clause terminator and ignoring the zero padding
/// tail. Malformed trailing fragments (e.g. a dangling literal with no lbd)
/// are discarded rather than treated as fatal, matching §7's "bad clause"
/// handling for anything arriving off the wire.
pub fn deserialize(buf: &[i32], origin: Origin) -> Vec<ClauseRef> {
    let mut out = Vec::new();
    let mut current: Vec<i32> = Vec::new();
    for &word in buf {
        if word == 0 {
            if current.len() >= 2 {
                let lbd = current.pop().unwrap();
                let literals = current.clone();
                if lbd > 0 {
                    if let Ok(record) = ClauseRecord::new(literals, lbd as u32, origin) {
                        out.push(record);
                    }
                }
            }
            current.clear();
        } else {
            current.push(word);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::Origin;

    fn cls(lits: &[i32], lbd: u32) -> ClauseRef {
        ClauseRecord::new(lits.to_vec(), lbd, Origin::Solver(0)).unwrap()
    }

    #[test]
    fn roundtrip_fits_in_capacity() {
        let mut clauses = vec![cls(&[1, 2], 2), cls(&[3, -4, 5], 3)];
        let buf = serialize(&mut clauses, 32);
        assert!(clauses.is_empty());
        let back = deserialize(&buf, Origin::External);
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].literals(), &[1, 2]);
        assert_eq!(back[0].lbd(), 2);
        assert_eq!(back[1].literals(), &[3, -4, 5]);
    }

    #[test]
    fn overflow_leaves_remainder_in_place() {
        let mut clauses = vec![cls(&[1, 2], 2), cls(&[3, 4], 2), cls(&[5, 6], 2)];
        // Room for exactly one clause (2 literals + lbd + terminator = 4).
        let buf = serialize(&mut clauses, 4);
        assert_eq!(clauses.len(), 2);
        let back = deserialize(&buf, Origin::External);
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].literals(), &[1, 2]);
    }

    #[test]
    fn padding_is_ignored() {
        let mut clauses = vec![cls(&[7], 1)];
        let buf = serialize(&mut clauses, 16);
        assert_eq!(buf.len(), 16);
        assert!(buf[3..].iter().all(|&x| x == 0));
        let back = deserialize(&buf, Origin::External);
        assert_eq!(back.len(), 1);
    }
}
