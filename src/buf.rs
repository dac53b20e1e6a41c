use crate::{UnpackError, UnpackErrorKind, UnpackResult};

/// A shrinking view over the remaining bytes of an unpack buffer.
///
/// Each element consumes a prefix; whatever is left can be recovered as a
/// zero-copy `Bytes` remainder for the caller or an enclosing
/// variable-length element.
#[derive(Debug)]
pub struct BufView<'a> {
    b: &'a bytes::Bytes,
    data: &'a [u8],
}

impl<'a> BufView<'a> {
    pub fn new(b: &'a bytes::Bytes) -> Self {
        BufView { b, data: b }
    }

    /// Split off the leading `amt` bytes, advancing this view past them.
    pub(crate) fn read(&mut self, amt: usize) -> UnpackResult<Self> {
        if amt > self.len() {
            return Err(UnpackError::new(UnpackErrorKind::Truncated {
                needed: amt,
                available: self.len(),
            }));
        }
        let (result, data) = self.data.split_at(amt);
        self.data = data;
        Ok(BufView {
            b: self.b,
            data: result,
        })
    }

    /// The remaining data as a zero-copy `Bytes` slice.
    pub(crate) fn remaining(&self) -> bytes::Bytes {
        self.b.slice_ref(self.data)
    }
}

impl std::ops::Deref for BufView<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data
    }
}
