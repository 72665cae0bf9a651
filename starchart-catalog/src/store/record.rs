//! Fixed-size binary codec for one catalogue object.
//!
//! Every record occupies exactly [`RECORD_SIZE`] bytes, little-endian, with
//! no padding:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 10 | Bayer letter (NUL-padded UTF-8) |
//! | 10 | 24 | Full Bayer designation |
//! | 34 | 32 | Proper name |
//! | 66 | 24 | Variable-star designation |
//! | 90 | 6 | Flamsteed number |
//! | 96 | 4 × 3 | HD, HIP, HR numbers (`u32`, 0 when absent) |
//! | 108 | 8 × 6 | RA, Dec (radians, J2000), mag, B−V, parallax, distance (`f64`) |

use byteorder::{ByteOrder, LittleEndian};

/// Encoded size of one [`CatalogueRecord`], in bytes.
pub const RECORD_SIZE: usize = 156;

const NAME_WIDTHS: [usize; 5] = [10, 24, 32, 24, 6];
const NAMES_END: usize = 96;
const NUMBERS_END: usize = NAMES_END + 12;

const _: () = assert!(
    NAME_WIDTHS[0] + NAME_WIDTHS[1] + NAME_WIDTHS[2] + NAME_WIDTHS[3] + NAME_WIDTHS[4] == NAMES_END
);
const _: () = assert!(NUMBERS_END + 6 * 8 == RECORD_SIZE);

/// The five display-name schemes a record can carry.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameField {
    /// Informal designation, e.g. the Greek letter alone.
    BayerLetter,
    /// Formal designation, e.g. `Alpha_Lyr`.
    BayerDesignation,
    ProperName,
    /// Variable-star identifier, e.g. `V337_Car`.
    VariableId,
    /// Numbered-sequence identifier.
    FlamsteedNumber,
}

/// Catalogue numbering systems stored alongside the names.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogueNumber {
    HenryDraper,
    Hipparcos,
    /// Yale Bright Star / Harvard Revised number.
    HarvardRevised,
}

impl CatalogueNumber {
    /// Label prefix used when the number is printed on a chart.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::HenryDraper => "HD",
            Self::Hipparcos => "HIP",
            Self::HarvardRevised => "HR",
        }
    }
}

/// One object of the star catalogue.
///
/// Empty strings and zero catalogue numbers mean "absent".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogueRecord {
    pub bayer_letter: String,
    pub bayer_designation: String,
    pub proper_name: String,
    pub variable_id: String,
    pub flamsteed_number: String,
    pub hd_number: u32,
    pub hip_number: u32,
    pub hr_number: u32,
    /// Right ascension, radians, J2000.0.
    pub ra: f64,
    /// Declination, radians, J2000.0.
    pub dec: f64,
    /// Apparent V-band magnitude.
    pub mag: f64,
    /// B−V colour index.
    pub colour_index: f64,
    /// Parallax, milliarcseconds.
    pub parallax: f64,
    /// Distance, light years.
    pub distance: f64,
}

impl CatalogueRecord {
    /// Returns the requested display name, or `None` when it is absent.
    pub fn name(&self, field: NameField) -> Option<&str> {
        let value = match field {
            NameField::BayerLetter => &self.bayer_letter,
            NameField::BayerDesignation => &self.bayer_designation,
            NameField::ProperName => &self.proper_name,
            NameField::VariableId => &self.variable_id,
            NameField::FlamsteedNumber => &self.flamsteed_number,
        };
        if value.is_empty() || value == "-" {
            None
        } else {
            Some(value.as_str())
        }
    }

    pub fn catalogue_number(&self, scheme: CatalogueNumber) -> Option<u32> {
        let n = match scheme {
            CatalogueNumber::HenryDraper => self.hd_number,
            CatalogueNumber::Hipparcos => self.hip_number,
            CatalogueNumber::HarvardRevised => self.hr_number,
        };
        (n > 0).then_some(n)
    }

    /// Writes this record into `buf`, which must be exactly [`RECORD_SIZE`] bytes.
    ///
    /// Names longer than their field are truncated on a character boundary.
    pub fn encode(&self, buf: &mut [u8]) {
        assert_eq!(buf.len(), RECORD_SIZE, "record buffer has wrong length");
        buf.fill(0);

        let names = [
            &self.bayer_letter,
            &self.bayer_designation,
            &self.proper_name,
            &self.variable_id,
            &self.flamsteed_number,
        ];
        let mut offset = 0;
        for (name, width) in names.iter().zip(NAME_WIDTHS) {
            let bytes = truncate_utf8(name, width);
            buf[offset..offset + bytes.len()].copy_from_slice(bytes);
            offset += width;
        }

        LittleEndian::write_u32(&mut buf[96..100], self.hd_number);
        LittleEndian::write_u32(&mut buf[100..104], self.hip_number);
        LittleEndian::write_u32(&mut buf[104..108], self.hr_number);

        let values = [
            self.ra,
            self.dec,
            self.mag,
            self.colour_index,
            self.parallax,
            self.distance,
        ];
        LittleEndian::write_f64_into(&values, &mut buf[NUMBERS_END..]);
    }

    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        self.encode(&mut buf);
        buf
    }

    /// Reads a record from `buf`, which must be exactly [`RECORD_SIZE`] bytes.
    pub fn decode(buf: &[u8]) -> Self {
        assert_eq!(buf.len(), RECORD_SIZE, "record buffer has wrong length");

        let mut names: [String; 5] = Default::default();
        let mut offset = 0;
        for (slot, width) in names.iter_mut().zip(NAME_WIDTHS) {
            *slot = read_name(&buf[offset..offset + width]);
            offset += width;
        }
        let [bayer_letter, bayer_designation, proper_name, variable_id, flamsteed_number] = names;

        let mut values = [0f64; 6];
        LittleEndian::read_f64_into(&buf[NUMBERS_END..], &mut values);

        Self {
            bayer_letter,
            bayer_designation,
            proper_name,
            variable_id,
            flamsteed_number,
            hd_number: LittleEndian::read_u32(&buf[96..100]),
            hip_number: LittleEndian::read_u32(&buf[100..104]),
            hr_number: LittleEndian::read_u32(&buf[104..108]),
            ra: values[0],
            dec: values[1],
            mag: values[2],
            colour_index: values[3],
            parallax: values[4],
            distance: values[5],
        }
    }

    /// Magnitude straight from an encoded record, without decoding the names.
    pub fn peek_mag(buf: &[u8]) -> f64 {
        LittleEndian::read_f64(&buf[NUMBERS_END + 16..NUMBERS_END + 24])
    }
}

fn truncate_utf8(s: &str, width: usize) -> &[u8] {
    if s.len() <= width {
        return s.as_bytes();
    }
    let mut end = width;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s.as_bytes()[..end]
}

fn read_name(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
