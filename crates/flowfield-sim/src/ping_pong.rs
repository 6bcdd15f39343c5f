/// Double-buffered storage with an explicit front/back role.
///
/// The front buffer holds the last fully computed state and is the only one
/// exposed for reading. The back buffer is the write target of the next
/// transform. Roles flip in [`PingPong::swap`], never in the middle of a write.
#[derive(Debug, Clone)]
pub struct PingPong<T> {
    buffers: [Vec<T>; 2],
    front: usize,
}

impl<T: Clone> PingPong<T> {
    /// Creates both buffers as copies of `initial`.
    pub fn new(initial: Vec<T>) -> Self {
        Self {
            buffers: [initial.clone(), initial],
            front: 0,
        }
    }

    /// Overwrites both buffers with `contents` and resets the roles.
    ///
    /// Panics if `contents` does not match the buffer length.
    pub fn fill_from(&mut self, contents: &[T]) {
        assert_eq!(contents.len(), self.len(), "ping-pong buffers are never resized");
        for buf in &mut self.buffers {
            buf.clone_from_slice(contents);
        }
        self.front = 0;
    }
}

impl<T> PingPong<T> {
    /// Number of elements per buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffers[0].len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffers[0].is_empty()
    }

    /// Index (0 or 1) of the current front buffer.
    #[inline]
    pub fn front_index(&self) -> usize {
        self.front
    }

    /// The readable buffer.
    #[inline]
    pub fn front(&self) -> &[T] {
        &self.buffers[self.front]
    }

    /// Splits into `(front, back)`: read-only front, writable back.
    ///
    /// The two slices always come from distinct buffers.
    pub fn split(&mut self) -> (&[T], &mut [T]) {
        let [a, b] = &mut self.buffers;
        if self.front == 0 {
            (a.as_slice(), b.as_mut_slice())
        } else {
            (b.as_slice(), a.as_mut_slice())
        }
    }

    /// Promotes the back buffer to front.
    #[inline]
    pub fn swap(&mut self) {
        self.front ^= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_identical_buffers() {
        let mut pp = PingPong::new(vec![1, 2, 3]);
        assert_eq!(pp.front(), &[1, 2, 3]);
        let (front, back) = pp.split();
        assert_eq!(front, back);
    }

    #[test]
    fn writes_land_in_back_until_swap() {
        let mut pp = PingPong::new(vec![0u32; 4]);
        {
            let (front, back) = pp.split();
            for (dst, src) in back.iter_mut().zip(front) {
                *dst = src + 1;
            }
        }
        assert_eq!(pp.front(), &[0, 0, 0, 0]);
        pp.swap();
        assert_eq!(pp.front(), &[1, 1, 1, 1]);
        assert_eq!(pp.front_index(), 1);
    }

    #[test]
    fn swap_alternates_roles() {
        let mut pp = PingPong::new(vec![0u8]);
        pp.swap();
        pp.swap();
        assert_eq!(pp.front_index(), 0);
    }

    #[test]
    fn fill_from_resets_front() {
        let mut pp = PingPong::new(vec![0; 2]);
        pp.swap();
        pp.fill_from(&[7, 8]);
        assert_eq!(pp.front_index(), 0);
        let (front, back) = pp.split();
        assert_eq!(front, &[7, 8]);
        assert_eq!(back, &[7, 8]);
    }
}
