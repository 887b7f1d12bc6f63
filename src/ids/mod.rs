//! Vendor, product and class name lookup.
//!
//! An [`IdDatabase`] holds five flat tables. The vendor and class tables are
//! sorted by id and searched by interpolation. Products, subclasses and
//! protocols are stored in contiguous runs, one run per owning vendor, class
//! or subclass, and the owner's `(offset, count)` pair selects its run. Ids in
//! those tables are only unique within a run.
//!
//! Lookups never fail: a miss returns a shared sentinel entry with an empty
//! name (check with `is_null()`).

use std::borrow::Cow;

use log::debug;

use crate::{Error, ErrorKind};

#[cfg(feature = "builtin-ids")]
mod builtin;
mod usb_ids;

type Name = Cow<'static, str>;

/// Vendor table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorEntry {
    pub id: u16,
    pub name: Name,
    pub product_offset: usize,
    pub product_count: usize,
}

/// Product table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductEntry {
    pub id: u16,
    pub name: Name,
}

/// Class table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    pub id: u8,
    pub name: Name,
    pub subclass_offset: usize,
    pub subclass_count: usize,
}

/// Subclass table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubclassEntry {
    pub id: u8,
    pub name: Name,
    pub protocol_offset: usize,
    pub protocol_count: usize,
}

/// Protocol table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolEntry {
    pub id: u8,
    pub name: Name,
}

static NULL_VENDOR: VendorEntry = VendorEntry {
    id: 0,
    name: Cow::Borrowed(""),
    product_offset: 0,
    product_count: 0,
};

static NULL_PRODUCT: ProductEntry = ProductEntry {
    id: 0,
    name: Cow::Borrowed(""),
};

static NULL_CLASS: ClassEntry = ClassEntry {
    id: 0,
    name: Cow::Borrowed(""),
    subclass_offset: 0,
    subclass_count: 0,
};

static NULL_SUBCLASS: SubclassEntry = SubclassEntry {
    id: 0,
    name: Cow::Borrowed(""),
    protocol_offset: 0,
    protocol_count: 0,
};

static NULL_PROTOCOL: ProtocolEntry = ProtocolEntry {
    id: 0,
    name: Cow::Borrowed(""),
};

macro_rules! impl_is_null {
    ($($ty:ident => $sentinel:ident),*) => {
        $(
            impl $ty {
                /// Whether this is the "not found" sentinel.
                pub fn is_null(&self) -> bool {
                    std::ptr::eq(self, &$sentinel)
                }
            }
        )*
    };
}

impl_is_null! {
    VendorEntry => NULL_VENDOR,
    ProductEntry => NULL_PRODUCT,
    ClassEntry => NULL_CLASS,
    SubclassEntry => NULL_SUBCLASS,
    ProtocolEntry => NULL_PROTOCOL
}

/// Vendor and product resolved together by [`IdDatabase::vid_pid`].
#[derive(Debug, Clone, Copy)]
pub struct VidPid<'a> {
    pub vendor: &'a VendorEntry,
    pub product: &'a ProductEntry,
}

/// Class, subclass and protocol resolved together by [`IdDatabase::class_sub_proto`].
#[derive(Debug, Clone, Copy)]
pub struct ClassSubProto<'a> {
    pub class: &'a ClassEntry,
    pub subclass: &'a SubclassEntry,
    pub protocol: &'a ProtocolEntry,
}

/// Immutable identifier tables.
///
/// Build one with [`IdDatabaseBuilder`], [`IdDatabase::parse_usb_ids`], or use the
/// compiled-in [`IdDatabase::builtin`].
#[derive(Debug, Clone, Default)]
pub struct IdDatabase {
    vendors: Vec<VendorEntry>,
    products: Vec<ProductEntry>,
    classes: Vec<ClassEntry>,
    subclasses: Vec<SubclassEntry>,
    protocols: Vec<ProtocolEntry>,
}

impl IdDatabase {
    /// A database without entries. Every lookup returns the sentinel.
    pub const fn empty() -> Self {
        IdDatabase {
            vendors: Vec::new(),
            products: Vec::new(),
            classes: Vec::new(),
            subclasses: Vec::new(),
            protocols: Vec::new(),
        }
    }

    /// Process-wide database compiled into the crate, built on first use.
    #[cfg(feature = "builtin-ids")]
    pub fn builtin() -> &'static IdDatabase {
        static DB: once_cell::sync::Lazy<IdDatabase> = once_cell::sync::Lazy::new(builtin::build);
        &DB
    }

    /// Parse the text of a linux-usb `usb.ids` file.
    ///
    /// Vendor, product, and `C` class sections are read; all other sections are skipped.
    pub fn parse_usb_ids(text: &str) -> Result<IdDatabase, Error> {
        usb_ids::parse(text)
    }

    pub fn vendors(&self) -> &[VendorEntry] {
        &self.vendors
    }

    pub fn products(&self) -> &[ProductEntry] {
        &self.products
    }

    pub fn classes(&self) -> &[ClassEntry] {
        &self.classes
    }

    pub fn subclasses(&self) -> &[SubclassEntry] {
        &self.subclasses
    }

    pub fn protocols(&self) -> &[ProtocolEntry] {
        &self.protocols
    }

    /// Look up a vendor by id.
    pub fn vendor(&self, id: u16) -> &VendorEntry {
        match interpolation_search(&self.vendors, id, |v| v.id) {
            Some(i) => &self.vendors[i],
            None => &NULL_VENDOR,
        }
    }

    /// Look up a product of `vendor`.
    ///
    /// A vendor with a single known product resolves to that product whatever `id` is.
    pub fn product(&self, vendor: &VendorEntry, id: u16) -> &ProductEntry {
        let Some(products) = run(&self.products, vendor.product_offset, vendor.product_count)
        else {
            return &NULL_PRODUCT;
        };
        if let [only] = products {
            return only;
        }
        products
            .iter()
            .find(|p| p.id == id)
            .unwrap_or(&NULL_PRODUCT)
    }

    /// Look up a class by id.
    pub fn class(&self, id: u8) -> &ClassEntry {
        match interpolation_search(&self.classes, id as u16, |c| c.id as u16) {
            Some(i) => &self.classes[i],
            None => &NULL_CLASS,
        }
    }

    /// Look up a subclass within the run `[offset, offset + count)` owned by a class.
    pub fn subclass(&self, id: u8, offset: usize, count: usize) -> &SubclassEntry {
        run(&self.subclasses, offset, count)
            .and_then(|r| r.iter().find(|s| s.id == id))
            .unwrap_or(&NULL_SUBCLASS)
    }

    /// Look up a protocol within the run `[offset, offset + count)` owned by a subclass.
    pub fn protocol(&self, id: u8, offset: usize, count: usize) -> &ProtocolEntry {
        run(&self.protocols, offset, count)
            .and_then(|r| r.iter().find(|p| p.id == id))
            .unwrap_or(&NULL_PROTOCOL)
    }

    /// Resolve a vendor id and product id.
    pub fn vid_pid(&self, vendor_id: u16, product_id: u16) -> VidPid<'_> {
        let vendor = self.vendor(vendor_id);
        let product = if vendor.product_count > 0 {
            self.product(vendor, product_id)
        } else {
            &NULL_PRODUCT
        };
        VidPid { vendor, product }
    }

    /// Resolve a class, subclass and protocol triple.
    pub fn class_sub_proto(&self, class: u8, subclass: u8, protocol: u8) -> ClassSubProto<'_> {
        let class = self.class(class);
        let subclass = self.subclass(subclass, class.subclass_offset, class.subclass_count);
        let protocol = self.protocol(protocol, subclass.protocol_offset, subclass.protocol_count);
        ClassSubProto {
            class,
            subclass,
            protocol,
        }
    }
}

/// Slice `[offset, offset + count)` of `table`, or `None` if empty or out of range.
fn run<T>(table: &[T], offset: usize, count: usize) -> Option<&[T]> {
    if count == 0 {
        return None;
    }
    table.get(offset..offset.checked_add(count)?)
}

/// Find `id` in `entries`, which must be sorted ascending by `key`.
///
/// The first probe is placed by linear interpolation between the first and
/// last keys; on a miss the search walks towards the target until it hits the
/// end of the table.
pub(crate) fn interpolation_search<T>(
    entries: &[T],
    id: u16,
    key: impl Fn(&T) -> u16,
) -> Option<usize> {
    let first = key(entries.first()?);
    let last = key(entries.last()?);
    if id < first || id > last {
        return None;
    }

    let max_idx = entries.len() - 1;
    let mut idx = if first == last {
        0
    } else {
        ((id - first) as u64 * max_idx as u64 / (last - first) as u64) as usize
    };

    let probe = key(&entries[idx]);
    if probe == id {
        return Some(idx);
    }

    if id < probe {
        while idx > 0 {
            idx -= 1;
            if key(&entries[idx]) == id {
                return Some(idx);
            }
        }
    } else {
        while idx < max_idx {
            idx += 1;
            if key(&entries[idx]) == id {
                return Some(idx);
            }
        }
    }
    None
}

struct VendorDef {
    id: u16,
    name: Name,
    products: Vec<ProductEntry>,
}

struct ClassDef {
    id: u8,
    name: Name,
    subclasses: Vec<SubclassDef>,
}

struct SubclassDef {
    id: u8,
    name: Name,
    protocols: Vec<ProtocolEntry>,
}

/// Collects vendors and classes in any order and lays them out as an [`IdDatabase`].
///
/// Products attach to the most recently added vendor, subclasses to the most
/// recent class and protocols to the most recent subclass. Repeated vendor or
/// class ids are merged.
#[derive(Default)]
pub struct IdDatabaseBuilder {
    vendors: Vec<VendorDef>,
    classes: Vec<ClassDef>,
}

impl IdDatabaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vendor(&mut self, id: u16, name: impl Into<Name>) -> &mut Self {
        self.vendor_with_products(id, name.into(), Vec::new())
    }

    /// Add a vendor together with all of its products.
    fn vendor_with_products(
        &mut self,
        id: u16,
        name: Name,
        products: Vec<ProductEntry>,
    ) -> &mut Self {
        self.vendors.push(VendorDef { id, name, products });
        self
    }

    pub fn product(&mut self, id: u16, name: impl Into<Name>) -> Result<&mut Self, Error> {
        let vendor = self.vendors.last_mut().ok_or(Error::new(
            ErrorKind::InvalidDatabase,
            "product without a vendor",
        ))?;
        vendor.products.push(ProductEntry {
            id,
            name: name.into(),
        });
        Ok(self)
    }

    pub fn class(&mut self, id: u8, name: impl Into<Name>) -> &mut Self {
        self.class_with_subclasses(id, name.into(), Vec::new())
    }

    /// Add a class together with its subclasses and their protocols.
    fn class_with_subclasses(
        &mut self,
        id: u8,
        name: Name,
        subclasses: Vec<SubclassDef>,
    ) -> &mut Self {
        self.classes.push(ClassDef { id, name, subclasses });
        self
    }

    pub fn subclass(&mut self, id: u8, name: impl Into<Name>) -> Result<&mut Self, Error> {
        let class = self.classes.last_mut().ok_or(Error::new(
            ErrorKind::InvalidDatabase,
            "subclass without a class",
        ))?;
        class.subclasses.push(SubclassDef {
            id,
            name: name.into(),
            protocols: Vec::new(),
        });
        Ok(self)
    }

    pub fn protocol(&mut self, id: u8, name: impl Into<Name>) -> Result<&mut Self, Error> {
        let subclass = self
            .classes
            .last_mut()
            .and_then(|c| c.subclasses.last_mut())
            .ok_or(Error::new(
                ErrorKind::InvalidDatabase,
                "protocol without a subclass",
            ))?;
        subclass.protocols.push(ProtocolEntry {
            id,
            name: name.into(),
        });
        Ok(self)
    }

    pub fn build(self) -> IdDatabase {
        let mut db = IdDatabase::default();

        let mut vendors = self.vendors;
        vendors.sort_by_key(|v| v.id);
        vendors.dedup_by(|later, kept| {
            if later.id != kept.id {
                return false;
            }
            debug!("merging repeated vendor 0x{:04x}", later.id);
            kept.products.append(&mut later.products);
            true
        });

        for mut vendor in vendors {
            vendor.products.sort_by_key(|p| p.id);
            db.vendors.push(VendorEntry {
                id: vendor.id,
                name: vendor.name,
                product_offset: db.products.len(),
                product_count: vendor.products.len(),
            });
            db.products.append(&mut vendor.products);
        }

        let mut classes = self.classes;
        classes.sort_by_key(|c| c.id);
        classes.dedup_by(|later, kept| {
            if later.id != kept.id {
                return false;
            }
            debug!("merging repeated class 0x{:02x}", later.id);
            kept.subclasses.append(&mut later.subclasses);
            true
        });

        for mut class in classes {
            class.subclasses.sort_by_key(|s| s.id);
            db.classes.push(ClassEntry {
                id: class.id,
                name: class.name,
                subclass_offset: db.subclasses.len(),
                subclass_count: class.subclasses.len(),
            });
            for mut subclass in class.subclasses {
                subclass.protocols.sort_by_key(|p| p.id);
                db.subclasses.push(SubclassEntry {
                    id: subclass.id,
                    name: subclass.name,
                    protocol_offset: db.protocols.len(),
                    protocol_count: subclass.protocols.len(),
                });
                db.protocols.append(&mut subclass.protocols);
            }
        }

        db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IdDatabase {
        let mut b = IdDatabaseBuilder::new();
        b.vendor(0x1d6b, "Linux Foundation");
        b.product(0x0003, "3.0 root hub").unwrap();
        b.product(0x0002, "2.0 root hub").unwrap();
        b.vendor(0x0001, "Fry's Electronics");
        b.vendor(0x0a12, "Cambridge Silicon Radio, Ltd");
        b.product(0x0001, "Bluetooth Dongle (HCI mode)").unwrap();
        b.vendor(0xffee, "FNK Tech");
        b.vendor(0x046d, "Logitech, Inc.");
        b.product(0xc52b, "Unifying Receiver").unwrap();
        b.product(0xc077, "M105 Optical Mouse").unwrap();

        b.class(0x03, "Human Interface Device");
        b.subclass(0x00, "No Subclass").unwrap();
        b.protocol(0x01, "Keyboard").unwrap();
        b.protocol(0x02, "Mouse").unwrap();
        b.subclass(0x01, "Boot Interface Subclass").unwrap();
        b.protocol(0x02, "Mouse").unwrap();
        b.protocol(0x01, "Keyboard").unwrap();
        b.class(0x01, "Audio");
        b.subclass(0x01, "Control Device").unwrap();
        b.subclass(0x02, "Streaming").unwrap();
        b.subclass(0x03, "MIDI Streaming").unwrap();
        b.class(0xff, "Vendor Specific Class");
        b.subclass(0xff, "Vendor Specific Subclass").unwrap();
        b.build()
    }

    #[test]
    fn test_layout_sorted() {
        let db = sample();
        let ids: Vec<u16> = db.vendors().iter().map(|v| v.id).collect();
        assert_eq!(ids, [0x0001, 0x046d, 0x0a12, 0x1d6b, 0xffee]);

        let linux = db.vendor(0x1d6b);
        assert_eq!(linux.product_count, 2);
        let products = &db.products()[linux.product_offset..][..linux.product_count];
        assert_eq!(products[0].id, 0x0002);
        assert_eq!(products[1].id, 0x0003);

        let classes: Vec<u8> = db.classes().iter().map(|c| c.id).collect();
        assert_eq!(classes, [0x01, 0x03, 0xff]);
        assert_eq!(db.classes()[1].subclass_offset, 3);
    }

    #[test]
    fn test_interpolation_matches_linear_scan() {
        let db = sample();
        for (i, v) in db.vendors().iter().enumerate() {
            assert_eq!(interpolation_search(db.vendors(), v.id, |v| v.id), Some(i));
            assert_eq!(db.vendor(v.id), v);
        }

        let dense: Vec<u16> = (0..500).map(|i| i * 5 + (i % 4)).collect();
        for (i, &id) in dense.iter().enumerate() {
            assert_eq!(interpolation_search(&dense, id, |&v| v), Some(i));
        }
        for id in 0..=u16::MAX {
            let linear = dense.iter().position(|&v| v == id);
            assert_eq!(interpolation_search(&dense, id, |&v| v), linear);
        }
    }

    #[test]
    fn test_total_lookups() {
        let db = sample();
        for id in 0..=u16::MAX {
            let v = db.vendor(id);
            assert!(v.is_null() || v.id == id);
        }
        for id in 0..=u8::MAX {
            let c = db.class(id);
            assert!(c.is_null() || c.id == id);
            let s = db.subclass(id, 0, db.subclasses().len());
            assert!(s.is_null() || s.id == id);
            let p = db.protocol(id, 0, db.protocols().len());
            assert!(p.is_null() || p.id == id);
        }

        let empty = IdDatabase::default();
        assert!(empty.vendor(0).is_null());
        assert!(empty.class(3).is_null());
        assert!(empty.subclass(1, 0, 1).is_null());
        assert!(empty.protocol(1, usize::MAX, 2).is_null());
    }

    #[test]
    fn test_misses() {
        let db = sample();
        assert!(db.vendor(0x0000).is_null());
        assert!(db.vendor(0x1d6c).is_null());
        assert!(db.vendor(0xffff).is_null());
        assert!(db.class(0x02).is_null());
        assert_eq!(db.vendor(0x0001).name, "Fry's Electronics");
    }

    #[test]
    fn test_subclass_restricted_to_owner() {
        let db = sample();
        let audio = db.class(0x01);
        assert_eq!(db.subclass(0x03, audio.subclass_offset, audio.subclass_count).name, "MIDI Streaming");

        // 0xff exists, but in the vendor-specific class's run
        let sub = db.subclass(0xff, audio.subclass_offset, audio.subclass_count);
        assert!(sub.is_null());

        let hid = db.class(0x03);
        let boot = db.subclass(0x01, hid.subclass_offset, hid.subclass_count);
        assert_eq!(boot.name, "Boot Interface Subclass");
        assert!(db.subclass(0x03, hid.subclass_offset, hid.subclass_count).is_null());
        assert_eq!(db.protocol(0x01, boot.protocol_offset, boot.protocol_count).name, "Keyboard");
    }

    #[test]
    fn test_products() {
        let db = sample();
        let r = db.vid_pid(0x046d, 0xc077);
        assert_eq!(r.vendor.name, "Logitech, Inc.");
        assert_eq!(r.product.name, "M105 Optical Mouse");

        assert!(db.vid_pid(0x046d, 0x0001).product.is_null());

        // single-product vendors resolve directly
        let r = db.vid_pid(0x0a12, 0x1234);
        assert_eq!(r.product.name, "Bluetooth Dongle (HCI mode)");

        let r = db.vid_pid(0xffee, 0x0001);
        assert!(!r.vendor.is_null());
        assert!(r.product.is_null());

        let r = db.vid_pid(0x9999, 0x0001);
        assert!(r.vendor.is_null());
        assert!(r.product.is_null());
    }

    #[test]
    fn test_class_sub_proto() {
        let db = sample();
        let r = db.class_sub_proto(0x03, 0x01, 0x02);
        assert_eq!(r.class.name, "Human Interface Device");
        assert_eq!(r.subclass.name, "Boot Interface Subclass");
        assert_eq!(r.protocol.name, "Mouse");

        let r = db.class_sub_proto(0x01, 0x02, 0x00);
        assert_eq!(r.subclass.name, "Streaming");
        assert!(r.protocol.is_null());

        let r = db.class_sub_proto(0x0e, 0x01, 0x00);
        assert!(r.class.is_null());
        assert!(r.subclass.is_null());
        assert!(r.protocol.is_null());
    }

    #[test]
    fn test_builder_merges_and_rejects_orphans() {
        let mut b = IdDatabaseBuilder::new();
        assert_eq!(
            b.product(1, "orphan").err().map(|e| e.kind()),
            Some(ErrorKind::InvalidDatabase)
        );
        assert!(b.protocol(1, "orphan").is_err());
        b.vendor(0x0403, "Future Technology Devices International, Ltd");
        b.product(0x6001, "FT232 Serial (UART) IC").unwrap();
        b.vendor(0x0403, "Future Technology Devices International, Ltd");
        b.product(0x6014, "FT232H Single HS USB-UART/FIFO IC").unwrap();
        let db = b.build();
        assert_eq!(db.vendors().len(), 1);
        assert_eq!(db.vendor(0x0403).product_count, 2);
        assert_eq!(db.vid_pid(0x0403, 0x6014).product.name, "FT232H Single HS USB-UART/FIFO IC");
    }
}
