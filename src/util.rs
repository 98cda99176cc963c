use std::{fmt, fmt::Write};

/// Round up to a multiple of `align` (which must be a power of two)
pub const fn roundto(num: u32, align: u32) -> u32 {
    (num + align - 1) & !(align - 1)
}

/// Dump `sz` bytes starting at `p` as a classic hex + ASCII listing
///
/// Only meant for eyeballing arena contents from tests.
pub unsafe fn _debug_hexdump(p: *const u8, sz: usize) -> Result<String, fmt::Error> {
    let mut s = String::new();

    for (row, off) in (0..sz).step_by(16).enumerate() {
        let chunk_sz = usize::min(16, sz - off);
        write!(&mut s, "{:08X}: ", row * 16)?;
        for i in 0..16 {
            if i < chunk_sz {
                write!(&mut s, "{:02X} ", *p.add(off + i))?;
            } else {
                write!(&mut s, "   ")?;
            }
        }
        write!(&mut s, "| ")?;
        for i in 0..chunk_sz {
            let c = *p.add(off + i);
            if c.is_ascii_graphic() {
                write!(&mut s, "{}", c as char)?;
            } else {
                write!(&mut s, ".")?;
            }
        }
        writeln!(&mut s)?;
    }

    Ok(s)
}
