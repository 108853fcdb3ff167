// Standalone Handle tests (roots not bound to any cache).
//
// Invariants exercised:
// - use_count equals the number of live handles sharing a root.
// - The last handle destroys the resource exactly once.
// - Projections share the root's count and keep it alive.
use resource_cache::{Handle, NullHandle};
use std::any::Any;
use std::cell::Cell;
use std::fmt::Debug;
use std::rc::Rc;

struct Texture {
    width: u32,
    drops: Rc<Cell<u32>>,
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

fn texture(width: u32, drops: &Rc<Cell<u32>>) -> Handle<Texture> {
    Handle::new(Texture {
        width,
        drops: drops.clone(),
    })
}

// Test: count follows clones and drops.
// Verifies: destruction happens once, on the last drop.
#[test]
fn use_count_tracks_live_handles() {
    let drops = Rc::new(Cell::new(0));
    let t = texture(64, &drops);
    let copies: Vec<_> = (0..5).map(|_| t.clone()).collect();
    assert_eq!(t.use_count(), 6);
    drop(copies);
    assert_eq!(t.use_count(), 1);
    assert_eq!(drops.get(), 0);
    drop(t);
    assert_eq!(drops.get(), 1);
}

// Test: null handles.
// Verifies: null is reported, not counted, and try_get names the error.
#[test]
fn null_handle_behaviour() {
    let h: Handle<Texture> = Handle::default();
    assert!(h.is_null());
    assert_eq!(h.use_count(), 0);
    assert!(matches!(h.try_get(), Err(NullHandle)));
    assert_eq!(NullHandle.to_string(), "dereferenced a null handle");
    assert!(Handle::ptr_eq(&h, &Handle::<Texture>::null()));
}

// Test: facade handles via trait objects.
// Verifies: up-cast and checked down-cast share one root.
#[test]
fn upcast_and_downcast_share_root() {
    let drops = Rc::new(Cell::new(0));
    let t = texture(128, &drops);
    let width_view: Handle<dyn Debug> = t.map(|t| &t.width as &(dyn Debug + 'static));
    assert_eq!(format!("{:?}", &*width_view), "128");

    let erased: Handle<dyn Any> = t.map(|t| t as &(dyn Any + 'static));
    drop(t);
    assert_eq!(drops.get(), 0);

    let back = erased.downcast::<Texture>().expect("texture");
    assert_eq!(back.width, 128);
    assert!(erased.downcast::<String>().is_none());
    assert_eq!(back.use_count(), 3);

    drop((width_view, erased, back));
    assert_eq!(drops.get(), 1);
}

// Test: slices as projections.
// Verifies: unsized projections deref to the right data.
#[test]
fn slice_projection() {
    let h = Handle::new(vec![1u8, 2, 3, 4]);
    let tail: Handle<[u8]> = h.map(|v| &v[2..]);
    assert_eq!(&*tail, &[3, 4]);
    assert!(Handle::ptr_eq(&h, &tail));
    assert_ne!(
        h.map(|v| &v[..]),
        tail,
        "different views of one root are different handles"
    );
}

static PALETTE: [u32; 3] = [0xff0000, 0x00ff00, 0x0000ff];

// Test: resources that are themselves references.
// Verifies: a `'static` borrow can be wrapped and projected through; the
// projection keeps the outer root counted.
#[test]
fn static_reference_resource_projects() {
    let outer: Handle<&'static [u32; 3]> = Handle::new(&PALETTE);
    let colors: Handle<[u32; 3]> = outer.map(|r| *r);
    let green: Handle<u32> = colors.map(|c| &c[1]);
    assert_eq!(*green, 0x00ff00);
    assert!(std::ptr::eq(&*colors, &PALETTE));
    assert_eq!(outer.use_count(), 3);
    drop((outer, colors));
    assert_eq!(green.use_count(), 1);
}

// Test: Debug formatting.
#[test]
fn debug_shows_value_and_count() {
    let h = Handle::new(5u8);
    let _h2 = h.clone();
    assert_eq!(format!("{:?}", h), "Handle { value: 5, use_count: 2 }");
}
