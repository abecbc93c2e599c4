//! Basic pretty printing facilities

use pretty::{DocAllocator, DocBuilder, RcAllocator};

/// Default render width for dumps
pub const WIDTH: usize = 80;

pub trait ToPretty {
    fn pretty<'b, D, A>(&'b self, allocator: &'b D) -> DocBuilder<'b, D, A>
    where
        D: DocAllocator<'b, A>,
        D::Doc: Clone,
        A: Clone;
}

/// Render to a string at the default width
pub fn prettify<I>(item: &I) -> String
where
    I: ToPretty,
{
    prettify_width(item, WIDTH)
}

/// Render to a string at the specified width
pub fn prettify_width<I>(item: &I, width: usize) -> String
where
    I: ToPretty,
{
    let allocator = RcAllocator;
    let doc = item.pretty::<_, ()>(&allocator).append(allocator.hardline());
    let mut w = Vec::new();
    match doc.1.render(width, &mut w) {
        Ok(()) => String::from_utf8_lossy(&w).into_owned(),
        Err(_) => String::new(),
    }
}
