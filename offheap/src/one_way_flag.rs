/*
 *  Copyright (C) 2025  Markus Elias Gerber
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use core::sync::atomic::{AtomicBool, Ordering};

/// A boolean that can move away from its initial value exactly once.
///
/// The current value is always `initial ^ changed`, so a single atomic cell is
/// enough and no intermediate state can be observed.
#[derive(Debug)]
pub struct OneWayFlag {
    initial: bool,
    changed: AtomicBool,
}

impl OneWayFlag {
    pub const fn new(initial: bool) -> Self {
        Self {
            initial,
            changed: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.initial ^ self.changed.load(Ordering::Acquire)
    }

    /// Flips the value if it was not flipped yet.
    ///
    /// Returns `true` only for the one call that performed the flip.
    #[inline]
    pub fn change(&self) -> bool {
        self.changed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[inline]
    pub fn has_changed(&self) -> bool {
        self.changed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Barrier,
        },
        thread,
    };

    use super::OneWayFlag;

    fn check_one_way_flag(initial: bool) {
        let flag = OneWayFlag::new(initial);
        assert_eq!(flag.get(), initial);
        assert!(!flag.has_changed());

        assert!(flag.change());
        assert!(flag.has_changed());
        assert_eq!(flag.get(), !initial);

        // second change does not flip back
        assert!(!flag.change());
        assert!(flag.has_changed());
        assert_eq!(flag.get(), !initial);
    }

    #[test]
    fn test_one_way_flag() {
        check_one_way_flag(true);
        check_one_way_flag(false);
    }

    #[test]
    fn test_one_way_flag_concurrent_change() {
        const THREADS: usize = 8;

        for _ in 0..50 {
            let flag = Arc::new(OneWayFlag::new(true));
            let barrier = Arc::new(Barrier::new(THREADS));
            let winners = Arc::new(AtomicUsize::new(0));

            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let flag = flag.clone();
                    let barrier = barrier.clone();
                    let winners = winners.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        if flag.change() {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                        // every thread sees the flip once any change() returned
                        assert!(!flag.get());
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            assert_eq!(winners.load(Ordering::SeqCst), 1);
            assert!(!flag.get());
            assert!(flag.has_changed());
        }
    }
}
