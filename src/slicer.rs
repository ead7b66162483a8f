/*
 * Copyright (c) 2022 Frank Fischer <frank-fischer@shadow-soft.de>
 *
 * This program is free software: you can redistribute it and/or
 * modify it under the terms of the GNU General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful, but
 * WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
 * General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see  <http://www.gnu.org/licenses/>
 */

//! Partial-key queries over a static set of keys.
//!
//! A [`Slicer`] answers questions like "all flow variables of commodity
//! `c` entering node `n`", i.e. all keys matching a pattern `(c, *, n)`.
//! For each key position it stores a map from values to the (ascending)
//! indices of the keys having that value there. A query starts from the
//! shortest such list among the fixed positions and filters it by the
//! remaining fixed positions.
//!
//! # Example
//!
//! ```
//! use rs_netflow::slicer::{Pattern, Slicer};
//! use rs_netflow::{key, Value};
//!
//! let slicer = Slicer::new(3, vec![
//!     (key!["pens", "a", "b"], 0),
//!     (key!["pens", "b", "c"], 1),
//!     (key!["pencils", "a", "b"], 2),
//! ]);
//!
//! let b = Value::from("b");
//! let into_b = slicer
//!     .slice(&[Pattern::Any, Pattern::Any, Pattern::Is(&b)])
//!     .map(|(_, &i)| i)
//!     .collect::<Vec<_>>();
//! assert_eq!(into_b, vec![0, 2]);
//! ```

use crate::value::{Key, Value};
use either::Either;
use std::collections::HashMap;
use std::iter::Copied;
use std::ops::Range;
use std::slice;

/// One position of a query pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pattern<'a> {
    /// Matches every value.
    Any,
    /// Matches exactly this value.
    Is(&'a Value),
}

/// A static set of keys with associated data, indexed by key position.
#[derive(Clone, Debug)]
pub struct Slicer<T> {
    arity: usize,
    entries: Vec<(Key, T)>,
    index: Vec<HashMap<Value, Vec<usize>>>,
}

impl<T> Slicer<T> {
    /// Create a slicer for keys with `arity` fields.
    ///
    /// # Panics
    ///
    /// If some key does not have `arity` fields.
    pub fn new<I>(arity: usize, entries: I) -> Self
    where
        I: IntoIterator<Item = (Key, T)>,
    {
        let entries = entries.into_iter().collect::<Vec<_>>();
        let mut index = vec![HashMap::new(); arity];
        for (i, (key, _)) in entries.iter().enumerate() {
            assert_eq!(key.len(), arity, "Key with wrong number of fields");
            for (pos, v) in key.iter().enumerate() {
                index[pos].entry(v.clone()).or_insert_with(Vec::new).push(i);
            }
        }
        Slicer { arity, entries, index }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&Key, &T)> + '_ {
        self.entries.iter().map(|(k, x)| (k, x))
    }

    /// Iterate over all keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> + '_ {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Return all entries whose keys match `pattern`.
    ///
    /// The entries are returned in insertion order. A pattern with the
    /// wrong number of positions matches nothing.
    pub fn slice(&self, pattern: &[Pattern]) -> Slice<T> {
        let fixed = pattern
            .iter()
            .enumerate()
            .filter_map(|(pos, p)| match p {
                Pattern::Any => None,
                Pattern::Is(v) => Some((pos, (*v).clone())),
            })
            .collect::<Vec<_>>();

        let candidates = if pattern.len() != self.arity {
            Either::Right(EMPTY.iter().copied())
        } else if fixed.is_empty() {
            Either::Left(0..self.entries.len())
        } else {
            let shortest = fixed
                .iter()
                .map(|(pos, v)| self.index[*pos].get(v).map(|ids| ids.as_slice()).unwrap_or(EMPTY))
                .min_by_key(|ids| ids.len())
                .unwrap_or(EMPTY);
            Either::Right(shortest.iter().copied())
        };

        Slice {
            entries: &self.entries,
            fixed,
            candidates,
        }
    }
}

const EMPTY: &[usize] = &[];

/// Iterator over the entries matching a pattern, see [`Slicer::slice`].
///
/// The iterator can be cloned to restart the query.
#[derive(Clone, Debug)]
pub struct Slice<'a, T> {
    entries: &'a [(Key, T)],
    fixed: Vec<(usize, Value)>,
    candidates: Either<Range<usize>, Copied<slice::Iter<'a, usize>>>,
}

impl<'a, T> Iterator for Slice<'a, T> {
    type Item = (&'a Key, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let entries = self.entries;
        for i in &mut self.candidates {
            let (key, x) = &entries[i];
            if self.fixed.iter().all(|(pos, v)| key[*pos] == *v) {
                return Some((key, x));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{Pattern, Slicer};
    use crate::key;
    use crate::value::{Key, Value};

    fn slicer() -> Slicer<usize> {
        let keys = vec![
            key![1, 1, 2],
            key![1, 1, 4],
            key![1, 2, 5],
            key![1, 5, 4],
            key![2, 3, 2],
            key![2, 2, 5],
            key![2, 5, 6],
            key![1, 2, 4],
        ];
        Slicer::new(3, keys.into_iter().enumerate().map(|(i, k)| (k, i)))
    }

    fn ids(s: &Slicer<usize>, pattern: &[Pattern]) -> Vec<usize> {
        s.slice(pattern).map(|(_, &i)| i).collect()
    }

    #[test]
    fn wildcards() {
        use Pattern::*;
        let s = slicer();
        let (one, two, five) = (Value::from(1), Value::from(2), Value::from(5));

        assert_eq!(ids(&s, &[Any, Any, Any]), (0..8).collect::<Vec<_>>());
        assert_eq!(ids(&s, &[Is(&one), Is(&two), Any]), vec![2, 7]);
        assert_eq!(ids(&s, &[Any, Is(&two), Is(&five)]), vec![2, 5]);
        assert_eq!(ids(&s, &[Is(&two), Any, Is(&five)]), vec![5]);
        assert_eq!(ids(&s, &[Is(&two), Is(&two), Is(&five)]), vec![5]);
        assert_eq!(ids(&s, &[Any, Any, Is(&one)]), Vec::<usize>::new());
    }

    #[test]
    fn unknown_values_and_arity() {
        use Pattern::*;
        let s = slicer();
        let x = Value::from("x");
        assert_eq!(s.slice(&[Is(&x), Any, Any]).count(), 0);
        assert_eq!(s.slice(&[Any, Any]).count(), 0);
        assert_eq!(s.slice(&[Any, Any, Any, Any]).count(), 0);
    }

    #[test]
    fn restartable() {
        let s = slicer();
        let four = Value::from(4);
        let slice = s.slice(&[Pattern::Any, Pattern::Any, Pattern::Is(&four)]);
        let first = slice.clone().map(|(k, _)| k.clone()).collect::<Vec<Key>>();
        let second = slice.map(|(k, _)| k.clone()).collect::<Vec<Key>>();
        assert_eq!(first, vec![key![1, 1, 4], key![1, 5, 4], key![1, 2, 4]]);
        assert_eq!(first, second);
    }

    #[test]
    fn empty() {
        let s: Slicer<()> = Slicer::new(2, vec![]);
        assert!(s.is_empty());
        assert_eq!(s.slice(&[Pattern::Any, Pattern::Any]).count(), 0);
    }

    #[test]
    #[should_panic]
    fn wrong_arity() {
        Slicer::new(2, vec![(key![1, 2, 3], ())]);
    }
}
