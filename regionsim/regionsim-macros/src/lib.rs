use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

/// Derives `RegisterBlock` for a struct of `Register` fields.
///
/// `#[width(n)]` on the struct sets the register width in bytes (default 4).
/// Fields take `#[offset(n)]`, `#[reset(n)]` and `#[read_only]`; without an
/// offset a register follows the previous one.
#[proc_macro_derive(RegBlock, attributes(width, offset, reset, read_only))]
pub fn register_block(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    impl_register_block(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Debug)]
struct RegisterInfo {
    name: syn::Ident,
    offset: u64,
    reset: u64,
    read_only: bool,
}

fn int_arg(attr: &syn::Attribute) -> syn::Result<u64> {
    attr.parse_args::<syn::LitInt>()?.base10_parse()
}

fn impl_register_block(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    let width = match input.attrs.iter().find(|a| a.path().is_ident("width")) {
        Some(attr) => int_arg(attr)?,
        None => 4,
    };
    if !matches!(width, 1 | 2 | 4 | 8) {
        return Err(syn::Error::new_spanned(name, "Register width must be 1, 2, 4 or 8"));
    }

    let syn::Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(name, "RegBlock can only be used on structs"));
    };

    let mut reginfos = Vec::new();
    let mut off = 0;
    for f in data.fields.iter() {
        let is_register = matches!(&f.ty, syn::Type::Path(p) if p.path.is_ident("Register"));
        if !is_register {
            return Err(syn::Error::new_spanned(&f.ty, "RegBlock fields must be of type Register"));
        }

        let mut reset = 0;
        let mut read_only = false;
        for attr in &f.attrs {
            if attr.path().is_ident("offset") {
                off = int_arg(attr)?;
                if off % width != 0 {
                    return Err(syn::Error::new_spanned(attr, "Register offset must be aligned on its width"));
                }
            } else if attr.path().is_ident("reset") {
                reset = int_arg(attr)?;
            } else if attr.path().is_ident("read_only") {
                read_only = true;
            }
        }

        let Some(ident) = f.ident.clone() else {
            return Err(syn::Error::new_spanned(f, "RegBlock needs named fields"));
        };
        reginfos.push(RegisterInfo {
            name: ident,
            offset: off,
            reset,
            read_only,
        });
        off += width;
    }

    // Match arms for get() and get_mut()
    let get_matches = reginfos.iter().map(|ri| {
        let rname = &ri.name;
        let index = ri.offset / width;
        quote! {
            #index => Some(&self.#rname),
        }
    });

    let get_mut_matches = reginfos.iter().map(|ri| {
        let rname = &ri.name;
        let index = ri.offset / width;
        quote! {
            #index => Some(&mut self.#rname),
        }
    });

    // Field initializers for new()
    let new_fields = reginfos.iter().map(|ri| {
        let rname = &ri.name;
        let rnamestr = rname.to_string();
        let reset = ri.reset;
        let read_only = ri.read_only;
        quote! {
            #rname: Register { name: #rnamestr, value: #reset, read_only: #read_only },
        }
    });

    // Field setters for reset()
    let reset_fields = reginfos.iter().map(|ri| {
        let rname = &ri.name;
        let reset = ri.reset;
        quote! {
            self.#rname.value = #reset;
        }
    });

    let width32 = width as u32;

    Ok(quote! {
        impl RegisterBlock for #name {
            fn width(&self) -> u32 {
                #width32
            }

            fn get(&self, offset: u64) -> Option<&Register> {
                match offset / #width {
                    #(#get_matches)*
                    _ => None
                }
            }

            fn get_mut(&mut self, offset: u64) -> Option<&mut Register> {
                match offset / #width {
                    #(#get_mut_matches)*
                    _ => None
                }
            }
        }

        impl #name {
            pub fn new() -> Self {
                Self {
                    #(#new_fields)*
                }
            }

            pub fn reset(&mut self) {
                #(#reset_fields)*
            }
        }
    })
}
