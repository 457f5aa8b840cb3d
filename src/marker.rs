// Table B.1
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    /// For temporary private use in arithmetic coding
    TEM,
    /// Reserved (0x02..=0xBF)
    RES,
    /// Start Of Frame; the argument distinguishes the coding process:
    /// 0 = baseline DCT, 1 = extended sequential, 2 = progressive,
    /// 3 = lossless, 5..7 = differential, 9..15 = arithmetic variants.
    SOF(u8),
    /// Define Huffman table(s)
    DHT,
    /// Define arithmetic coding conditioning(s)
    DAC,
    /// Restart with modulo 8 count `m`
    RST(u8),
    /// Start of image
    SOI,
    /// End of image
    EOI,
    /// Start of scan
    SOS,
    /// Define quantization table(s)
    DQT,
    /// Define number of lines
    DNL,
    /// Define restart interval
    DRI,
    /// Define hierarchical progression
    DHP,
    /// Expand reference component(s)
    EXP,
    /// Reserved for application segments
    APP(u8),
    /// Reserved for JPEG extensions
    JPG(u8),
    /// Comment
    COM,
}

impl Marker {
    pub fn has_length(self) -> bool {
        use self::Marker::*;
        !matches!(self, RST(..) | SOI | EOI | TEM)
    }

    pub fn from_u8(n: u8) -> Option<Marker> {
        use self::Marker::*;
        match n {
            0x00 => None, // Byte stuffing
            0x01 => Some(TEM),
            0x02..=0xBF => Some(RES),
            0xC0 => Some(SOF(0)),
            0xC1 => Some(SOF(1)),
            0xC2 => Some(SOF(2)),
            0xC3 => Some(SOF(3)),
            0xC4 => Some(DHT),
            0xC5 => Some(SOF(5)),
            0xC6 => Some(SOF(6)),
            0xC7 => Some(SOF(7)),
            0xC8 => Some(JPG(0xC8)),
            0xC9 => Some(SOF(9)),
            0xCA => Some(SOF(10)),
            0xCB => Some(SOF(11)),
            0xCC => Some(DAC),
            0xCD => Some(SOF(13)),
            0xCE => Some(SOF(14)),
            0xCF => Some(SOF(15)),
            0xD0..=0xD7 => Some(RST(n - 0xD0)),
            0xD8 => Some(SOI),
            0xD9 => Some(EOI),
            0xDA => Some(SOS),
            0xDB => Some(DQT),
            0xDC => Some(DNL),
            0xDD => Some(DRI),
            0xDE => Some(DHP),
            0xDF => Some(EXP),
            0xE0..=0xEF => Some(APP(n - 0xE0)),
            0xF0..=0xFD => Some(JPG(n)),
            0xFE => Some(COM),
            0xFF => None, // Fill byte
        }
    }

    pub fn to_u8(self) -> u8 {
        use self::Marker::*;
        match self {
            TEM => 0x01,
            RES => 0x02,
            SOF(n) => 0xC0 + n,
            DHT => 0xC4,
            DAC => 0xCC,
            RST(n) => 0xD0 + n,
            SOI => 0xD8,
            EOI => 0xD9,
            SOS => 0xDA,
            DQT => 0xDB,
            DNL => 0xDC,
            DRI => 0xDD,
            DHP => 0xDE,
            EXP => 0xDF,
            APP(n) => 0xE0 + n,
            JPG(n) => n,
            COM => 0xFE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Marker;

    #[test]
    fn from_u8_round_trips() {
        for n in 0xC0u8..=0xFE {
            let marker = Marker::from_u8(n).unwrap();
            assert_eq!(marker.to_u8(), n, "marker byte {:#04x}", n);
        }
    }

    #[test]
    fn standalone_markers_have_no_length() {
        assert!(!Marker::SOI.has_length());
        assert!(!Marker::EOI.has_length());
        assert!(!Marker::RST(3).has_length());
        assert!(Marker::SOS.has_length());
        assert!(Marker::DQT.has_length());
    }
}
