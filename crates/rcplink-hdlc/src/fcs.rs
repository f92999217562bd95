//! FCS-16 frame check sequence (RFC 1662, reflected polynomial `0x8408`).

/// Initial accumulator value.
pub const INIT: u16 = 0xffff;

/// Residue of a running FCS computed over a frame and its appended
/// check sequence when the frame arrived intact.
pub const GOOD: u16 = 0xf0b8;

const POLYNOMIAL: u16 = 0x8408;

const TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut index = 0;
    while index < 256 {
        let mut fcs = index as u16;
        let mut bit = 0;
        while bit < 8 {
            fcs = if fcs & 1 != 0 {
                (fcs >> 1) ^ POLYNOMIAL
            } else {
                fcs >> 1
            };
            bit += 1;
        }
        table[index] = fcs;
        index += 1;
    }
    table
}

/// Folds one byte into the running check sequence.
#[inline]
pub fn update(fcs: u16, byte: u8) -> u16 {
    (fcs >> 8) ^ TABLE[usize::from((fcs ^ u16::from(byte)) & 0xff)]
}
