use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, LitStr, Type, parse_macro_input, spanned::Spanned};

/// Implements `rustmemorm::Entity` for a struct with named fields.
///
/// Struct options: `#[entity(table = "...", id = "...")]`.
/// Field options: `#[column(name = "...")]`, `#[column(skip)]`.
/// Exactly one field must have type `Identity`; it backs the id column.
#[proc_macro_derive(Entity, attributes(entity, column))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_entity(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Implements `rustmemorm::ColumnValue` for a unit-only enum, stored as the
/// variant name.
#[proc_macro_derive(ColumnEnum)]
pub fn derive_column_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_column_enum(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct EntityOptions {
    table_name: Option<String>,
    id_column: Option<String>,
}

#[derive(Default)]
struct ColumnOptions {
    column_name: Option<String>,
    skip: bool,
}

struct MappedField {
    ident: Ident,
    ty: Type,
    column: String,
}

fn expand_entity(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.generics,
            "Entity does not support generic structs",
        ));
    }

    let options = parse_entity_options(&input.attrs)?;

    let data_struct = match input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Entity can only be derived for structs",
            ));
        }
    };

    let named_fields = match data_struct.fields {
        Fields::Named(fields) => fields,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Entity requires named fields",
            ));
        }
    };

    let mut identity: Option<Ident> = None;
    let mut mapped = Vec::<MappedField>::new();

    for field in named_fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "Entity requires named fields"))?;
        let column_options = parse_column_options(&field.attrs)?;

        if is_identity_type(&field.ty) {
            if identity.is_some() {
                return Err(syn::Error::new(
                    field.span(),
                    "Entity must have exactly one Identity field",
                ));
            }
            if column_options.column_name.is_some() || column_options.skip {
                return Err(syn::Error::new(
                    field.span(),
                    "The Identity field takes its column from #[entity(id = \"...\")]",
                ));
            }
            identity = Some(ident);
            continue;
        }

        if column_options.skip {
            continue;
        }

        let column = column_options
            .column_name
            .unwrap_or_else(|| ident.to_string().trim_start_matches("r#").to_string());
        mapped.push(MappedField {
            ident,
            ty: field.ty,
            column,
        });
    }

    let identity = identity.ok_or_else(|| {
        syn::Error::new(
            struct_name.span(),
            "Entity requires one field of type Identity",
        )
    })?;

    let table_call = options
        .table_name
        .map(|table| quote! { .table(#table) });
    let id_call = options
        .id_column
        .map(|id| quote! { .id_column(#id) });

    let declarations = mapped.iter().map(|field| {
        let ty = &field.ty;
        let name = field.ident.to_string();
        let column = &field.column;
        quote! { .field::<#ty>(#name, #column) }
    });

    let values = mapped.iter().map(|field| {
        let ident = &field.ident;
        let column = &field.column;
        quote! {
            (#column, ::rustmemorm::schema::ColumnValue::to_field(&self.#ident))
        }
    });

    let setters = mapped.iter().map(|field| {
        let ident = &field.ident;
        let ty = &field.ty;
        let column = &field.column;
        quote! {
            #column => {
                self.#ident = <#ty as ::rustmemorm::schema::ColumnValue>::from_field(value)?;
                ::std::result::Result::Ok(true)
            }
        }
    });

    Ok(quote! {
        impl ::rustmemorm::schema::Entity for #struct_name {
            fn declaration() -> ::rustmemorm::schema::EntityDecl {
                ::rustmemorm::schema::EntityDecl::new::<Self>()
                    #table_call
                    #id_call
                    #(#declarations)*
            }

            fn identity(&self) -> &::rustmemorm::schema::Identity {
                &self.#identity
            }

            fn identity_mut(&mut self) -> &mut ::rustmemorm::schema::Identity {
                &mut self.#identity
            }

            fn field_values(&self) -> ::std::vec::Vec<(&'static str, ::rustmemorm::core::FieldValue)> {
                ::std::vec![#(#values),*]
            }

            fn set_field(
                &mut self,
                column: &str,
                value: ::rustmemorm::core::FieldValue,
            ) -> ::std::result::Result<bool, ::rustmemorm::core::FieldMismatch> {
                match column {
                    #(#setters)*
                    _ => ::std::result::Result::Ok(false),
                }
            }
        }
    })
}

fn expand_column_enum(input: DeriveInput) -> syn::Result<TokenStream2> {
    let enum_name = input.ident;

    let data_enum = match input.data {
        Data::Enum(data) => data,
        _ => {
            return Err(syn::Error::new(
                enum_name.span(),
                "ColumnEnum can only be derived for enums",
            ));
        }
    };

    let mut variants = Vec::<Ident>::new();
    for variant in data_enum.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new(
                variant.span(),
                "ColumnEnum supports unit variants only",
            ));
        }
        variants.push(variant.ident);
    }

    let names: Vec<String> = variants.iter().map(ToString::to_string).collect();
    let type_name = enum_name.to_string();

    Ok(quote! {
        impl ::rustmemorm::schema::ColumnValue for #enum_name {
            fn field_type() -> ::rustmemorm::core::FieldType {
                ::rustmemorm::core::FieldType::Enum { type_name: #type_name }
            }

            fn to_field(&self) -> ::rustmemorm::core::FieldValue {
                let name = match self {
                    #(Self::#variants => #names,)*
                };
                ::rustmemorm::core::FieldValue::Enum(name.to_string())
            }

            fn from_field(
                value: ::rustmemorm::core::FieldValue,
            ) -> ::std::result::Result<Self, ::rustmemorm::core::FieldMismatch> {
                match value {
                    ::rustmemorm::core::FieldValue::Enum(name)
                    | ::rustmemorm::core::FieldValue::Text(name) => match name.as_str() {
                        #(#names => ::std::result::Result::Ok(Self::#variants),)*
                        other => ::std::result::Result::Err(::rustmemorm::core::FieldMismatch {
                            expected: #type_name.to_string(),
                            found: ::std::format!("unknown variant '{}'", other),
                        }),
                    },
                    other => ::std::result::Result::Err(other.mismatch(#type_name)),
                }
            }
        }
    })
}

fn is_identity_type(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Identity"),
        _ => false,
    }
}

fn parse_entity_options(attrs: &[syn::Attribute]) -> syn::Result<EntityOptions> {
    let mut options = EntityOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.table_name = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("id") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.id_column = Some(lit.value());
                return Ok(());
            }

            Err(meta.error(
                "Unsupported entity attribute. Supported: table = \"...\", id = \"...\"",
            ))
        })?;
    }

    Ok(options)
}

fn parse_column_options(attrs: &[syn::Attribute]) -> syn::Result<ColumnOptions> {
    let mut options = ColumnOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("column") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                options.skip = true;
                return Ok(());
            }

            if meta.path.is_ident("name") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.column_name = Some(lit.value());
                return Ok(());
            }

            Err(meta.error("Unsupported column attribute. Supported: skip, name = \"...\""))
        })?;

        if options.skip && options.column_name.is_some() {
            return Err(syn::Error::new(
                attr.span(),
                "#[column(skip)] cannot define a column name",
            ));
        }
    }

    Ok(options)
}
